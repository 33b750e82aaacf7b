//! Terminal rendering of the conversation and venue views.

use colored::Colorize;
use concierge_core::auth::UserProfile;
use concierge_core::ledger::{Exchange, Reply};
use concierge_core::rating::{MAX_SCORE, RatingDraft, RatingState};
use concierge_core::venue::{VenueDetail, VenueReview, VenueSummary};
use concierge_interaction::{PendingRating, SystemStats};

pub const TYPING_INDICATOR: &str = "Assistant is typing...";

/// Lines for one exchange: the user half (skipped for the welcome) and the
/// assistant half.
pub fn exchange_lines(exchange: &Exchange) -> Vec<String> {
    let mut lines = Vec::new();
    if !exchange.is_welcome() {
        lines.push(format!("{} {}", "you>".green().bold(), exchange.user_text.green()));
    }

    match &exchange.reply {
        Reply::Pending => lines.push(TYPING_INDICATOR.bright_black().italic().to_string()),
        Reply::Completed {
            assistant_text,
            backend_id,
            ..
        } => {
            let label = match backend_id {
                Some(id) => format!("bot #{id}>"),
                None => "bot>".to_string(),
            };
            let mut text_lines = assistant_text.lines();
            let first = text_lines.next().unwrap_or_default();
            lines.push(format!("{} {}", label.bright_blue().bold(), first.bright_blue()));
            lines.extend(text_lines.map(|line| format!("     {}", line.bright_blue())));
        }
        Reply::Failed { error_text } => {
            lines.push(format!("{} {}", "bot>".red().bold(), error_text.red()));
        }
    }
    lines
}

pub fn venue_lines(venues: &[VenueSummary]) -> Vec<String> {
    if venues.is_empty() {
        return vec!["No suggested venues right now.".bright_black().to_string()];
    }

    let mut lines = vec!["Suggested venues:".bright_yellow().bold().to_string()];
    for venue in venues {
        let category = venue
            .category
            .as_deref()
            .map(|c| format!(" ({c})"))
            .unwrap_or_default();
        let relevance = if venue.score > 0.0 {
            format!(" - {}% match", venue.relevance_percent())
        } else {
            String::new()
        };
        lines.push(format!(
            "  [{}] {}{}{}",
            venue.id.to_string().yellow(),
            venue.name.bold(),
            category,
            relevance.bright_black()
        ));
    }
    lines.push(
        "Use /venue <id> for details or /rate-venue <id> to leave a review."
            .bright_black()
            .to_string(),
    );
    lines
}

pub fn venue_detail_lines(venue: &VenueDetail, reviews: &[VenueReview]) -> Vec<String> {
    let mut header = venue.name.bold().to_string();
    if venue.is_verified {
        header.push_str(&format!(" {}", "(verified)".green()));
    }
    let mut lines = vec![header];

    if let Some(category) = &venue.category {
        lines.push(format!("  Category: {category}"));
    }
    if let Some(location) = &venue.location {
        let place: Vec<&str> = [location.address.as_deref(), location.city.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        if !place.is_empty() {
            lines.push(format!("  Address: {}", place.join(", ")));
        }
    }
    if let Some(price) = &venue.price_range {
        lines.push(format!("  Price: {price}"));
    }
    if !venue.amenities.is_empty() {
        lines.push(format!("  Amenities: {}", venue.amenities.join(", ")));
    }
    if venue.has_rating() {
        lines.push(format!(
            "  Rating: {:.1}/{} from {} review(s)",
            venue.rating, MAX_SCORE, venue.review_count
        ));
    } else {
        lines.push("  Not rated yet".bright_black().to_string());
    }
    if let Some(description) = &venue.description {
        lines.push(String::new());
        lines.extend(description.lines().map(|l| format!("  {l}")));
    }

    if !reviews.is_empty() {
        lines.push(String::new());
        lines.push("Recent reviews:".bright_yellow().to_string());
        for review in reviews {
            let author = review.username.as_deref().unwrap_or("guest");
            let text = review.review.as_deref().unwrap_or("(no text)");
            lines.push(format!("  {} {} - {}", stars(review.rating), author.bold(), text));
        }
    }
    lines
}

/// Renders a score as filled and empty stars.
pub fn stars(score: f64) -> String {
    let filled = score.round().clamp(0.0, f64::from(MAX_SCORE)) as usize;
    format!(
        "{}{}",
        "*".repeat(filled),
        ".".repeat(usize::from(MAX_SCORE) - filled)
    )
}

pub fn rating_status(state: &RatingState) -> String {
    match state {
        RatingState::Idle => "No rating in progress.".bright_black().to_string(),
        RatingState::Collecting(draft) => draft_line("Rating", draft),
        RatingState::Submitting(draft) => draft_line("Submitting", draft),
    }
}

fn draft_line(verb: &str, draft: &RatingDraft) -> String {
    let score = if draft.score == 0 {
        "no score yet".to_string()
    } else {
        stars(f64::from(draft.score))
    };
    let feedback = if draft.feedback.is_empty() {
        String::new()
    } else {
        format!(" \"{}\"", draft.feedback)
    };
    format!("{} {}: {}{}", verb.bright_magenta(), draft.target, score, feedback)
}

pub fn profile_line(profile: &UserProfile) -> String {
    let role = if profile.is_admin() { "admin" } else { "user" };
    let status = if profile.is_active { "active" } else { "inactive" };
    format!(
        "#{} {} <{}> [{}, {}]",
        profile.id,
        profile.username.bold(),
        profile.email,
        role,
        status
    )
}

pub fn stats_lines(stats: &SystemStats) -> Vec<String> {
    vec![
        format!("  Users:          {}", stats.total_users),
        format!("  Venues:         {}", stats.total_venues),
        format!("  Chats:          {}", stats.total_chats),
        format!("  Ratings:        {}", stats.total_ratings),
        format!("  Active (24h):   {}", stats.active_users_24h),
    ]
}

pub fn pending_rating_line(rating: &PendingRating) -> String {
    format!(
        "  [{}] venue #{} {} {}",
        rating.id.to_string().yellow(),
        rating.venue_id,
        stars(rating.rating),
        rating.review.as_deref().unwrap_or("(no text)")
    )
}

pub const HELP: &[(&str, &str)] = &[
    ("<text>", "Ask the assistant"),
    ("/history", "Show the whole conversation"),
    ("/venues", "List the venues suggested by the last reply"),
    ("/venue <id>", "Show venue details and reviews"),
    ("/rate <answer-id>", "Rate an assistant answer (ids are shown as bot #id)"),
    ("/rate-venue <id>", "Review a venue"),
    ("/score <1-5>", "Set the score of the open rating"),
    ("/feedback <text>", "Set the comment of the open rating"),
    ("/submit", "Send the open rating"),
    ("/cancel", "Discard the open rating"),
    ("/new", "Start a new conversation"),
    ("/login <user>", "Log in"),
    ("/register <user> <email>", "Create an account"),
    ("/whoami", "Show the logged-in account"),
    ("/logout", "Forget the stored credentials"),
    ("/admin ...", "Admin tools: stats, parse, pending, approve, reject, users, toggle"),
    ("quit", "Exit"),
];

pub fn help_lines() -> Vec<String> {
    HELP.iter()
        .map(|(usage, text)| format!("  {:<26} {}", usage.bright_cyan(), text))
        .collect()
}
