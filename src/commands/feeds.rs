use url::Url;

use crate::app::App;
use crate::error::{AppError, Result};
use crate::models::User;

pub async fn add_feed(app: &mut App, user: &User, name: &str, url: &str) -> Result<()> {
    Url::parse(url).map_err(|e| AppError::Argument(format!("invalid feed url {url:?}: {e}")))?;

    let feed = app.db.create_feed(name, url, user.id).await?;
    println!("Feed {} added ({})", feed.name, feed.url);

    // The creator follows their own feed right away.
    app.db.create_feed_follow(user.id, feed.id).await?;
    println!("{} is now following {}", user.name, feed.name);
    Ok(())
}

pub async fn list(app: &mut App) -> Result<()> {
    let feeds = app.db.list_feeds().await?;
    for feed in feeds {
        println!("{} {} (added by {})", feed.name, feed.url, feed.user_name);
    }
    Ok(())
}

pub async fn follow(app: &mut App, user: &User, url: &str) -> Result<()> {
    let feed = app
        .db
        .get_feed_by_url(url)
        .await?
        .ok_or_else(|| AppError::Argument(format!("no feed registered with url {url:?}")))?;

    match app.db.create_feed_follow(user.id, feed.id).await {
        Ok(_) => {
            println!("{} is now following {}", user.name, feed.name);
            Ok(())
        }
        Err(err) if err.is_unique_violation() => {
            println!("{} is already following {}", user.name, feed.name);
            Ok(())
        }
        Err(err) => Err(err),
    }
}

pub async fn following(app: &mut App, user: &User) -> Result<()> {
    let names = app.db.feed_follows_for_user(&user.name).await?;
    for name in names {
        println!("* {name}");
    }
    Ok(())
}

pub async fn unfollow(app: &mut App, user: &User, url: &str) -> Result<()> {
    let removed = app.db.delete_feed_follow_for_user(url, user.id).await?;
    if removed == 0 {
        println!("{} was not following {}", user.name, url);
    } else {
        println!("{} unfollowed {}", user.name, url);
    }
    Ok(())
}
