//! Parsing of REPL input into commands.

use concierge_core::ledger::BackendId;
use concierge_core::venue::VenueId;

/// Slash commands offered for completion.
pub const COMMANDS: &[&str] = &[
    "/help",
    "/history",
    "/venues",
    "/venue",
    "/rate",
    "/rate-venue",
    "/score",
    "/feedback",
    "/submit",
    "/cancel",
    "/new",
    "/login",
    "/register",
    "/whoami",
    "/logout",
    "/admin",
];

#[derive(Debug, Clone, PartialEq)]
pub enum AdminCommand {
    Stats,
    Parse {
        city: String,
        category: String,
        max_items: Option<u32>,
    },
    Pending,
    Approve(i64),
    Reject(i64),
    Users,
    Toggle(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Plain text for the assistant.
    Message(String),
    Help,
    History,
    Venues,
    Venue(VenueId),
    Rate(BackendId),
    RateVenue(VenueId),
    Score(u8),
    Feedback(String),
    Submit,
    Cancel,
    NewSession,
    Login(String),
    Register { username: String, email: String },
    WhoAmI,
    Logout,
    Admin(AdminCommand),
    Quit,
}

/// Parses one non-empty input line.
///
/// Errors carry the usage text to show the user.
pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    if line == "quit" || line == "exit" {
        return Ok(Command::Quit);
    }
    if !line.starts_with('/') {
        return Ok(Command::Message(line.to_string()));
    }

    let (name, rest) = match line.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (line, ""),
    };

    let command = match name {
        "/help" => Command::Help,
        "/history" => Command::History,
        "/venues" => Command::Venues,
        "/venue" => Command::Venue(VenueId(parse_id(rest, "/venue <venue-id>")?)),
        "/rate" => Command::Rate(BackendId(parse_id(
            rest.trim_start_matches('#'),
            "/rate <answer-id>",
        )?)),
        "/rate-venue" => Command::RateVenue(VenueId(parse_id(rest, "/rate-venue <venue-id>")?)),
        "/score" => Command::Score(
            rest.parse::<u8>()
                .map_err(|_| "usage: /score <1-5>".to_string())?,
        ),
        "/feedback" => Command::Feedback(rest.to_string()),
        "/submit" => Command::Submit,
        "/cancel" => Command::Cancel,
        "/new" => Command::NewSession,
        "/login" if !rest.is_empty() => Command::Login(rest.to_string()),
        "/login" => return Err("usage: /login <username>".to_string()),
        "/register" => {
            let mut parts = rest.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(username), Some(email), None) => Command::Register {
                    username: username.to_string(),
                    email: email.to_string(),
                },
                _ => return Err("usage: /register <username> <email>".to_string()),
            }
        }
        "/whoami" => Command::WhoAmI,
        "/logout" => Command::Logout,
        "/admin" => Command::Admin(parse_admin(rest)?),
        other => return Err(format!("Unknown command {other}. Type /help for a list.")),
    };
    Ok(command)
}

fn parse_admin(rest: &str) -> Result<AdminCommand, String> {
    const USAGE: &str =
        "usage: /admin stats | parse <city> <category> [max] | pending | approve <id> | reject <id> | users | toggle <user-id>";

    let parts: Vec<&str> = rest.split_whitespace().collect();
    let command = match parts.as_slice() {
        ["stats"] => AdminCommand::Stats,
        ["parse", city, category] => AdminCommand::Parse {
            city: city.to_string(),
            category: category.to_string(),
            max_items: None,
        },
        ["parse", city, category, max] => AdminCommand::Parse {
            city: city.to_string(),
            category: category.to_string(),
            max_items: Some(max.parse().map_err(|_| USAGE.to_string())?),
        },
        ["pending"] => AdminCommand::Pending,
        ["approve", id] => AdminCommand::Approve(parse_id(id, USAGE)?),
        ["reject", id] => AdminCommand::Reject(parse_id(id, USAGE)?),
        ["users"] => AdminCommand::Users,
        ["toggle", id] => AdminCommand::Toggle(parse_id(id, USAGE)?),
        _ => return Err(USAGE.to_string()),
    };
    Ok(command)
}

fn parse_id(raw: &str, usage: &str) -> Result<i64, String> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| format!("usage: {}", usage.trim_start_matches("usage: ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_a_message() {
        assert_eq!(
            parse("  sushi near the station? ").unwrap(),
            Command::Message("sushi near the station?".to_string())
        );
        assert_eq!(parse("exit").unwrap(), Command::Quit);
    }

    #[test]
    fn test_rating_commands() {
        assert_eq!(parse("/rate #41").unwrap(), Command::Rate(BackendId(41)));
        assert_eq!(parse("/rate 41").unwrap(), Command::Rate(BackendId(41)));
        assert_eq!(parse("/score 4").unwrap(), Command::Score(4));
        assert_eq!(
            parse("/feedback spot on").unwrap(),
            Command::Feedback("spot on".to_string())
        );
        assert_eq!(parse("/rate-venue 7").unwrap(), Command::RateVenue(VenueId(7)));
        assert!(parse("/score lots").is_err());
        assert_eq!(parse("/rate").unwrap_err(), "usage: /rate <answer-id>");
    }

    #[test]
    fn test_admin_commands() {
        assert_eq!(
            parse("/admin parse Kazan cafe 25").unwrap(),
            Command::Admin(AdminCommand::Parse {
                city: "Kazan".to_string(),
                category: "cafe".to_string(),
                max_items: Some(25),
            })
        );
        assert_eq!(
            parse("/admin reject 4").unwrap(),
            Command::Admin(AdminCommand::Reject(4))
        );
        assert!(parse("/admin").is_err());
        assert!(parse("/admin approve x").is_err());
    }

    #[test]
    fn test_unknown_and_incomplete_commands() {
        assert!(parse("/dance").unwrap_err().contains("Unknown command"));
        assert!(parse("/login").is_err());
        assert!(parse("/register dana").is_err());
        assert_eq!(
            parse("/register dana dana@example.com").unwrap(),
            Command::Register {
                username: "dana".to_string(),
                email: "dana@example.com".to_string(),
            }
        );
    }
}
