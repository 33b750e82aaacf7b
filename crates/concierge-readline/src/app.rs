//! REPL state and command handlers.

use std::sync::Arc;

use colored::Colorize;
use concierge_core::ConciergeError;
use concierge_core::backend::{CredentialProvider, VenueSource};
use concierge_core::config::{ChatConfig, ClientConfig};
use concierge_core::conversation::{ConversationController, SendOutcome};
use concierge_core::ledger::BackendId;
use concierge_core::rating::{RatingTarget, RatingWorkflow};
use concierge_core::venue::VenueId;
use concierge_interaction::{
    AdminClient, ApiClient, AuthClient, HttpTransport, ParserConfig, UserQuery,
};

use crate::commands::{AdminCommand, Command};
use crate::render;

const VENUE_REVIEW_PAGE: u32 = 5;
const MODERATION_PAGE: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    controller: ConversationController,
    api: Arc<ApiClient>,
    auth: AuthClient,
    admin: AdminClient,
    rating: RatingWorkflow,
    chat: ChatConfig,
    session_hint: Option<String>,
}

impl App {
    /// Connects the clients and restores the conversation.
    ///
    /// A history failure is not fatal: the user gets a fresh session.
    pub async fn start(
        config: &ClientConfig,
        credentials: Arc<dyn CredentialProvider>,
        session_hint: Option<&str>,
    ) -> anyhow::Result<Self> {
        let transport = HttpTransport::new(&config.api, credentials)?;
        let api = Arc::new(
            ApiClient::new(transport.clone()).with_history_limit(config.chat.history_limit),
        );

        let controller = match ConversationController::initialize(
            api.as_ref(),
            api.clone(),
            session_hint,
            &config.chat,
        )
        .await
        {
            Ok(controller) => controller,
            Err(e) => {
                tracing::warn!("[Startup] Could not load chat history: {}", e);
                if e.is_unauthorized() {
                    println!(
                        "{}",
                        "You are not logged in; history is unavailable. Use /login <user>."
                            .yellow()
                    );
                } else {
                    println!(
                        "{}",
                        format!("Could not load chat history ({e}). Starting a new conversation.")
                            .yellow()
                    );
                }
                ConversationController::new_session(api.clone(), &config.chat)?
            }
        };

        Ok(Self {
            controller,
            api,
            auth: AuthClient::new(transport.clone()),
            admin: AdminClient::new(transport),
            rating: RatingWorkflow::new(),
            chat: config.chat.clone(),
            session_hint: session_hint.map(str::to_string),
        })
    }

    pub async fn print_conversation(&self) {
        let view = self.controller.view().await;
        println!("{}", format!("session {}", view.session_id).bright_black());
        for exchange in &view.exchanges {
            print_lines(render::exchange_lines(exchange));
        }
        if !view.venues.is_empty() {
            print_lines(render::venue_lines(&view.venues));
        }
    }

    pub async fn handle(&mut self, command: Command) -> Flow {
        match command {
            Command::Quit => return Flow::Quit,
            Command::Message(text) => self.send(&text).await,
            Command::Help => print_lines(render::help_lines()),
            Command::History => self.print_conversation().await,
            Command::Venues => print_lines(render::venue_lines(&self.controller.recommendations().await)),
            Command::Venue(venue_id) => self.show_venue(venue_id).await,
            Command::Rate(backend_id) => self.open_answer_rating(backend_id).await,
            Command::RateVenue(venue_id) => {
                self.open_rating(RatingTarget::Venue(venue_id));
            }
            Command::Score(score) => {
                let result = self.rating.set_score(score);
                self.after_rating_edit(result);
            }
            Command::Feedback(text) => {
                let result = self.rating.set_feedback(text);
                self.after_rating_edit(result);
            }
            Command::Submit => self.submit_rating().await,
            Command::Cancel => match self.rating.cancel() {
                Ok(Some(draft)) => println!("{}", format!("Discarded rating for {}.", draft.target).bright_black()),
                Ok(None) => println!("{}", render::rating_status(self.rating.state())),
                Err(e) => report(&e),
            },
            Command::NewSession => self.new_session().await,
            Command::WhoAmI => match self.auth.current_user().await {
                Ok(profile) => println!("{}", render::profile_line(&profile)),
                Err(e) => report(&e),
            },
            Command::Logout => match self.auth.logout() {
                Ok(()) => println!("{}", "Logged out.".bright_green()),
                Err(e) => report(&e),
            },
            Command::Admin(admin) => self.admin(admin).await,
            Command::Login(_) | Command::Register { .. } => {
                // Password prompts need the line editor; the loop handles these.
                tracing::debug!("[Repl] Credential command reached the dispatcher");
            }
        }
        Flow::Continue
    }

    async fn send(&self, text: &str) {
        println!("{}", render::TYPING_INDICATOR.bright_black().italic());

        let outcome = match self.controller.send(text).await {
            Ok(outcome) => outcome,
            Err(e) => {
                report(&e);
                return;
            }
        };

        let view = self.controller.view().await;
        if let Some(exchange) = view.exchanges.iter().find(|e| e.index == outcome.index()) {
            // The user half was echoed by the line editor.
            print_lines(render::exchange_lines(exchange).into_iter().skip(1));
        }

        match outcome {
            SendOutcome::Completed {
                venue_count,
                session_rotated,
                ..
            } => {
                if session_rotated {
                    println!(
                        "{}",
                        format!("(continuing in session {})", view.session_id).bright_black()
                    );
                }
                if venue_count > 0 {
                    print_lines(render::venue_lines(&view.venues));
                }
            }
            SendOutcome::Failed { error, .. } => {
                if error.is_unauthorized() {
                    report(&error);
                }
            }
        }
    }

    async fn new_session(&mut self) {
        match self.controller.start_new_session().await {
            Ok(session_id) => {
                if let Ok(Some(draft)) = self.rating.cancel() {
                    tracing::debug!("[Repl] Dropped rating draft for {}", draft.target);
                }
                println!("{}", format!("Started session {session_id}.").bright_green());
                self.print_conversation().await;
            }
            Err(e) => report(&e),
        }
    }

    async fn show_venue(&self, venue_id: VenueId) {
        let venue = match self.api.fetch_venue(venue_id).await {
            Ok(venue) => venue,
            Err(e) => {
                report(&e);
                return;
            }
        };
        let reviews = self
            .api
            .fetch_venue_reviews(venue_id, VENUE_REVIEW_PAGE, 0)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("[Repl] Could not load reviews for venue {}: {}", venue_id, e);
                Vec::new()
            });
        print_lines(render::venue_detail_lines(&venue, &reviews));
        if let Some(summary) = self.controller.surfaced_venue(venue_id).await
            && summary.score > 0.0
        {
            println!(
                "{}",
                format!("  {}% match for your last question", summary.relevance_percent())
                    .bright_black()
            );
        }
    }

    async fn open_answer_rating(&mut self, backend_id: BackendId) {
        let Some(exchange) = self.controller.exchange_by_backend_id(backend_id).await else {
            println!(
                "{}",
                format!("There is no answer #{backend_id} in this conversation.").yellow()
            );
            return;
        };
        match self.rating.open_for_exchange(&exchange) {
            Ok(discarded) => self.after_open(discarded.map(|d| d.target)),
            Err(e) => report(&e),
        }
    }

    fn open_rating(&mut self, target: RatingTarget) {
        match self.rating.open(target) {
            Ok(discarded) => self.after_open(discarded.map(|d| d.target)),
            Err(e) => report(&e),
        }
    }

    fn after_open(&self, discarded: Option<RatingTarget>) {
        if let Some(target) = discarded {
            println!("{}", format!("Discarded unfinished rating for {target}.").bright_black());
        }
        println!("{}", render::rating_status(self.rating.state()));
        println!(
            "{}",
            "Set /score <1-5>, optionally /feedback <text>, then /submit.".bright_black()
        );
    }

    fn after_rating_edit(&self, result: concierge_core::Result<()>) {
        match result {
            Ok(()) => println!("{}", render::rating_status(self.rating.state())),
            Err(e) => report(&e),
        }
    }

    async fn submit_rating(&mut self) {
        if let Some(draft) = self.rating.draft() {
            println!("{}", format!("Submitting rating for {}...", draft.target).bright_black());
        }
        match self.rating.submit(self.api.as_ref()).await {
            Ok(()) => println!("{}", "Thanks for your feedback!".bright_green()),
            Err(e) => {
                report(&e);
                if !self.rating.is_idle() {
                    println!("{}", render::rating_status(self.rating.state()));
                }
            }
        }
    }

    pub async fn login(&mut self, username: &str, password: &str) {
        match self.auth.login(username, password).await {
            Ok(_) => {
                println!("{}", format!("Logged in as {username}.").bright_green());
                if self.reload_history().await {
                    self.print_conversation().await;
                }
            }
            Err(e) => report(&e),
        }
    }

    /// Replaces a welcome-only conversation with the user's persisted history.
    ///
    /// Returns `true` when the controller was rebuilt. A conversation the
    /// user has already written in, or one with a reply pending, is kept.
    async fn reload_history(&mut self) -> bool {
        if self.controller.is_pending().await {
            return false;
        }
        if !self.controller.snapshot().await.iter().all(|e| e.is_welcome()) {
            return false;
        }

        match ConversationController::initialize(
            self.api.as_ref(),
            self.api.clone(),
            self.session_hint.as_deref(),
            &self.chat,
        )
        .await
        {
            Ok(controller) => {
                self.controller = controller;
                if let Ok(Some(draft)) = self.rating.cancel() {
                    tracing::debug!("[Repl] Dropped rating draft for {}", draft.target);
                }
                tracing::info!("[Repl] Reloaded conversation after login");
                true
            }
            Err(e) => {
                tracing::warn!("[Repl] Could not load chat history after login: {}", e);
                false
            }
        }
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) {
        match self.auth.register(username, email, password).await {
            Ok(profile) => println!(
                "{}",
                format!("Created account {}. Use /login {} to sign in.", profile.username, profile.username)
                    .bright_green()
            ),
            Err(e) => report(&e),
        }
    }

    async fn admin(&self, command: AdminCommand) {
        let result = match command {
            AdminCommand::Stats => self.admin.stats().await.map(|stats| {
                println!("{}", "System statistics:".bright_yellow());
                print_lines(render::stats_lines(&stats));
            }),
            AdminCommand::Parse {
                city,
                category,
                max_items,
            } => {
                let mut config = ParserConfig::new(city, category);
                if let Some(max) = max_items {
                    config = config.with_max_items(max);
                }
                self.admin
                    .trigger_venue_parse(&config)
                    .await
                    .map(|message| println!("{}", message.bright_green()))
            }
            AdminCommand::Pending => self.admin.unmoderated_ratings(MODERATION_PAGE).await.map(|ratings| {
                if ratings.is_empty() {
                    println!("{}", "No reviews awaiting moderation.".bright_black());
                }
                for rating in &ratings {
                    println!("{}", render::pending_rating_line(rating));
                }
            }),
            AdminCommand::Approve(id) => self
                .admin
                .moderate_rating(id, true)
                .await
                .map(|message| println!("{}", message.bright_green())),
            AdminCommand::Reject(id) => self
                .admin
                .moderate_rating(id, false)
                .await
                .map(|message| println!("{}", message.bright_green())),
            AdminCommand::Users => self.admin.list_users(&UserQuery::default()).await.map(|users| {
                for user in &users {
                    println!("  {}", render::profile_line(user));
                }
            }),
            AdminCommand::Toggle(id) => self
                .admin
                .toggle_user_active(id)
                .await
                .map(|message| println!("{}", message.bright_green())),
        };
        if let Err(e) = result {
            report(&e);
        }
    }
}

fn print_lines(lines: impl IntoIterator<Item = String>) {
    for line in lines {
        println!("{line}");
    }
}

/// Prints an error the way the user should see it.
fn report(error: &ConciergeError) {
    match error {
        ConciergeError::Unauthorized => println!(
            "{}",
            "Not logged in or the session expired. Use /login <user>.".yellow()
        ),
        ConciergeError::Busy => println!("{}", "Still waiting for the previous reply.".yellow()),
        ConciergeError::Validation(message) => println!("{}", message.yellow()),
        other => println!("{}", format!("Error: {other}").red()),
    }
}
