mod feeds;
mod posts;
mod users;

use crate::app::App;
use crate::error::{AppError, Result};
use crate::scheduler;

/// The closed set of CLI commands. Parsing validates the verb and the
/// argument shape up front, so dispatch is a single exhaustive match and
/// a typo cannot create a dead command name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register { name: String },
    Login { name: String },
    Reset,
    Users,
    Agg { interval: String },
    AddFeed { name: String, url: String },
    Feeds,
    Follow { url: String },
    Following,
    Unfollow { url: String },
    Browse { limit: Option<i64> },
}

impl Command {
    pub fn parse(name: &str, args: &[String]) -> Result<Self> {
        match name {
            "register" => Ok(Self::Register {
                name: require_arg(args, 0, "register <name>")?,
            }),
            "login" => Ok(Self::Login {
                name: require_arg(args, 0, "login <name>")?,
            }),
            "reset" => Ok(Self::Reset),
            "users" => Ok(Self::Users),
            "agg" => Ok(Self::Agg {
                interval: require_arg(args, 0, "agg <interval>")?,
            }),
            "addfeed" => Ok(Self::AddFeed {
                name: require_arg(args, 0, "addfeed <name> <url>")?,
                url: require_arg(args, 1, "addfeed <name> <url>")?,
            }),
            "feeds" => Ok(Self::Feeds),
            "follow" => Ok(Self::Follow {
                url: require_arg(args, 0, "follow <url>")?,
            }),
            "following" => Ok(Self::Following),
            "unfollow" => Ok(Self::Unfollow {
                url: require_arg(args, 0, "unfollow <url>")?,
            }),
            "browse" => {
                let limit = match args.first() {
                    None => None,
                    Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
                        AppError::Argument(format!("invalid browse limit {raw:?}"))
                    })?),
                };
                Ok(Self::Browse { limit })
            }
            other => Err(AppError::UnknownCommand(other.to_string())),
        }
    }
}

fn require_arg(args: &[String], index: usize, usage: &str) -> Result<String> {
    args.get(index)
        .cloned()
        .ok_or_else(|| AppError::Argument(format!("missing argument, usage: {usage}")))
}

/// Dispatches a parsed command. Handlers that need an authenticated
/// context resolve the current user here, at the dispatch site.
pub async fn run(app: &mut App, command: Command) -> Result<()> {
    match command {
        Command::Register { name } => users::register(app, &name).await,
        Command::Login { name } => users::login(app, &name).await,
        Command::Reset => users::reset(app).await,
        Command::Users => users::list(app).await,
        Command::Agg { interval } => {
            let interval = scheduler::parse_interval(&interval)?;
            scheduler::run(&app.db, &app.fetcher, interval).await
        }
        Command::AddFeed { name, url } => {
            let user = app.current_user().await?;
            feeds::add_feed(app, &user, &name, &url).await
        }
        Command::Feeds => feeds::list(app).await,
        Command::Follow { url } => {
            let user = app.current_user().await?;
            feeds::follow(app, &user, &url).await
        }
        Command::Following => {
            let user = app.current_user().await?;
            feeds::following(app, &user).await
        }
        Command::Unfollow { url } => {
            let user = app.current_user().await?;
            feeds::unfollow(app, &user, &url).await
        }
        Command::Browse { limit } => {
            let user = app.current_user().await?;
            posts::browse(app, &user, limit).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_known_commands() {
        assert_eq!(
            Command::parse("register", &args(&["alice"])).unwrap(),
            Command::Register {
                name: "alice".to_string()
            }
        );
        assert_eq!(Command::parse("reset", &[]).unwrap(), Command::Reset);
        assert_eq!(
            Command::parse("agg", &args(&["1m"])).unwrap(),
            Command::Agg {
                interval: "1m".to_string()
            }
        );
        assert_eq!(
            Command::parse("addfeed", &args(&["blog", "https://example.com/rss"])).unwrap(),
            Command::AddFeed {
                name: "blog".to_string(),
                url: "https://example.com/rss".to_string()
            }
        );
    }

    #[test]
    fn unknown_verb_is_an_unknown_command_error() {
        let err = Command::parse("frobnicate", &[]).unwrap_err();
        assert!(matches!(err, AppError::UnknownCommand(name) if name == "frobnicate"));
    }

    #[test]
    fn missing_arguments_are_argument_errors() {
        assert!(matches!(
            Command::parse("register", &[]).unwrap_err(),
            AppError::Argument(_)
        ));
        assert!(matches!(
            Command::parse("addfeed", &args(&["blog"])).unwrap_err(),
            AppError::Argument(_)
        ));
    }

    #[test]
    fn browse_limit_is_optional_but_must_be_numeric() {
        assert_eq!(
            Command::parse("browse", &[]).unwrap(),
            Command::Browse { limit: None }
        );
        assert_eq!(
            Command::parse("browse", &args(&["5"])).unwrap(),
            Command::Browse { limit: Some(5) }
        );
        assert!(matches!(
            Command::parse("browse", &args(&["many"])).unwrap_err(),
            AppError::Argument(_)
        ));
    }
}
