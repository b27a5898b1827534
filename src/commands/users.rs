use crate::app::App;
use crate::error::{AppError, Result};

pub async fn register(app: &mut App, name: &str) -> Result<()> {
    let user = app.db.create_user(name).await?;
    app.config.set_user(&user.name)?;
    println!(
        "User {} registered (id {}, created at {})",
        user.name, user.id, user.created_at
    );
    Ok(())
}

pub async fn login(app: &mut App, name: &str) -> Result<()> {
    let user = app
        .db
        .get_user(name)
        .await?
        .ok_or_else(|| AppError::Auth(format!("cannot login unregistered user {name:?}")))?;
    app.config.set_user(&user.name)?;
    println!("Logged in as {}", user.name);
    Ok(())
}

pub async fn reset(app: &mut App) -> Result<()> {
    app.db.delete_users().await?;
    println!("Database reset");
    Ok(())
}

pub async fn list(app: &mut App) -> Result<()> {
    let users = app.db.get_users().await?;
    let current = app.config.current_user_name.as_deref();
    for user in users {
        if Some(user.name.as_str()) == current {
            println!("* {} (current)", user.name);
        } else {
            println!("* {}", user.name);
        }
    }
    Ok(())
}
