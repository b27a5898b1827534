use crate::app::App;
use crate::error::Result;
use crate::models::User;

const DEFAULT_BROWSE_LIMIT: i64 = 2;

pub async fn browse(app: &mut App, user: &User, limit: Option<i64>) -> Result<()> {
    let limit = limit.unwrap_or(DEFAULT_BROWSE_LIMIT);
    let posts = app.db.get_posts_for_user(&user.name, limit).await?;
    for post in posts {
        println!("{} ({})", post.title, post.published_at);
        println!("  {}", post.url);
        if let Some(description) = post.description {
            println!("  {description}");
        }
    }
    Ok(())
}
