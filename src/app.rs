use crate::auth::{AuthClient, Session};
use crate::config::Config;
use crate::gemini::GeminiClient;

/// Shown in the transcript when the generation backend fails. The underlying
/// error is logged, never surfaced.
pub const FALLBACK_REPLY: &str = "Something went wrong. Please try again.";

/// Inline error for a submit with a required field missing.
pub const MISSING_FIELDS: &str = "Please fill in all fields.";

/// How many ticks the welcome notice stays on screen (ticks are 300ms).
const WELCOME_TICKS: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Auth,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    SignIn,
    SignUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    Name,
    Email,
    Password,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// A validated submission, ready to be handed to the auth backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRequest {
    SignIn { email: String, password: String },
    SignUp { email: String, password: String, name: String },
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,

    // Auth form state
    pub form_mode: FormMode,
    pub auth_field: AuthField,
    pub name_input: String,
    pub email_input: String,
    pub password_input: String,
    pub auth_error: Option<String>,
    pub auth_task: Option<tokio::task::JoinHandle<anyhow::Result<Session>>>,
    pub session: Option<Session>,

    // Welcome handoff (one-shot: written on sign-up, taken on chat entry)
    pub pending_welcome: Option<String>,
    pub welcome_notice: Option<String>,
    welcome_ticks: u8,

    // Chat state
    pub chat_messages: Vec<ChatMessage>,
    pub chat_input: String,
    pub chat_cursor: usize, // cursor position in chat_input (chars)
    pub chat_loading: bool,
    pub chat_task: Option<tokio::task::JoinHandle<anyhow::Result<String>>>,
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of transcript area for scroll calculations
    pub chat_width: u16,  // Width of transcript area for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Backends
    pub auth: AuthClient,
    pub gemini: GeminiClient,
    pub model: String,
}

impl App {
    pub fn new(config: Config) -> Self {
        let auth = AuthClient::new(&config.auth_url, &config.auth_key);
        let gemini = GeminiClient::new(&config.gemini_api_key);
        let model = config
            .default_model
            .unwrap_or_else(|| "gemini-1.5-flash".to_string());

        Self {
            should_quit: false,
            screen: Screen::Auth,

            form_mode: FormMode::SignIn,
            auth_field: AuthField::Email,
            name_input: String::new(),
            email_input: String::new(),
            password_input: String::new(),
            auth_error: None,
            auth_task: None,
            session: None,

            pending_welcome: None,
            welcome_notice: None,
            welcome_ticks: 0,

            chat_messages: Vec::new(),
            chat_input: String::new(),
            chat_cursor: 0,
            chat_loading: false,
            chat_task: None,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,

            auth,
            gemini,
            model,
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.auth_task.is_some()
    }

    // Auth form actions

    /// Switch between sign-in and sign-up. Clears any error. Refused while a
    /// submission is in flight.
    pub fn toggle_form(&mut self) {
        if self.is_submitting() {
            return;
        }
        self.form_mode = match self.form_mode {
            FormMode::SignIn => FormMode::SignUp,
            FormMode::SignUp => FormMode::SignIn,
        };
        self.auth_error = None;
        self.auth_field = match self.form_mode {
            FormMode::SignIn => AuthField::Email,
            FormMode::SignUp => AuthField::Name,
        };
    }

    pub fn next_auth_field(&mut self) {
        self.auth_field = match (self.form_mode, self.auth_field) {
            (FormMode::SignUp, AuthField::Name) => AuthField::Email,
            (FormMode::SignUp, AuthField::Email) => AuthField::Password,
            (FormMode::SignUp, AuthField::Password) => AuthField::Name,
            (FormMode::SignIn, AuthField::Email) => AuthField::Password,
            (FormMode::SignIn, _) => AuthField::Email,
        };
    }

    pub fn prev_auth_field(&mut self) {
        self.auth_field = match (self.form_mode, self.auth_field) {
            (FormMode::SignUp, AuthField::Name) => AuthField::Password,
            (FormMode::SignUp, AuthField::Email) => AuthField::Name,
            (FormMode::SignUp, AuthField::Password) => AuthField::Email,
            (FormMode::SignIn, AuthField::Email) => AuthField::Password,
            (FormMode::SignIn, _) => AuthField::Email,
        };
    }

    pub fn focused_input_mut(&mut self) -> &mut String {
        match self.auth_field {
            AuthField::Name => &mut self.name_input,
            AuthField::Email => &mut self.email_input,
            AuthField::Password => &mut self.password_input,
        }
    }

    /// Validate the form and produce the request to run. Returns `None` when
    /// validation fails (error set inline) or a submission is already in
    /// flight. The backend is never invoked on a validation failure.
    pub fn submit_auth(&mut self) -> Option<AuthRequest> {
        if self.is_submitting() {
            return None;
        }

        let needs_name = self.form_mode == FormMode::SignUp;
        if self.email_input.is_empty()
            || self.password_input.is_empty()
            || (needs_name && self.name_input.is_empty())
        {
            self.auth_error = Some(MISSING_FIELDS.to_string());
            return None;
        }

        self.auth_error = None;
        Some(match self.form_mode {
            FormMode::SignIn => AuthRequest::SignIn {
                email: self.email_input.clone(),
                password: self.password_input.clone(),
            },
            FormMode::SignUp => AuthRequest::SignUp {
                email: self.email_input.clone(),
                password: self.password_input.clone(),
                name: self.name_input.clone(),
            },
        })
    }

    /// Apply the settled auth call. Success navigates to the chat screen and
    /// discards the credentials; on sign-up the chosen name is handed to the
    /// chat screen for a one-time welcome. Failure keeps the form with the
    /// backend's message shown verbatim.
    pub fn finish_auth(&mut self, result: anyhow::Result<Session>) {
        match result {
            Ok(session) => {
                if self.form_mode == FormMode::SignUp {
                    self.pending_welcome = Some(self.name_input.clone());
                }
                self.session = Some(session);
                self.name_input.clear();
                self.email_input.clear();
                self.password_input.clear();
                self.auth_error = None;
                self.enter_chat();
            }
            Err(e) => {
                self.auth_error = Some(e.to_string());
            }
        }
    }

    /// Navigate to the chat screen, consuming the welcome handoff if one was
    /// written. Once taken it cannot reappear without a new write.
    fn enter_chat(&mut self) {
        self.screen = Screen::Chat;
        if let Some(name) = self.pending_welcome.take() {
            self.welcome_notice = Some(format!("Welcome, {}!", name));
            self.welcome_ticks = WELCOME_TICKS;
        }
    }

    // Chat transcript controller

    /// Start a send: append the user message, clear the input, and return the
    /// prompt to run. `None` when the input is blank or a generation call is
    /// already outstanding (single-flight, owned here rather than by the UI).
    pub fn begin_send(&mut self) -> Option<String> {
        if self.chat_input.trim().is_empty() {
            return None;
        }
        if self.chat_task.is_some() {
            return None;
        }

        let text = self.chat_input.clone();
        self.chat_messages.push(ChatMessage {
            role: ChatRole::User,
            content: text.clone(),
        });
        self.chat_input.clear();
        self.chat_cursor = 0;
        self.chat_loading = true;
        self.scroll_chat_to_bottom();
        Some(text)
    }

    /// Apply the settled generation call. Failures become a single fixed
    /// fallback reply; the cause goes to the log only.
    pub fn finish_send(&mut self, result: anyhow::Result<String>) {
        let content = match result {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("generation request failed: {e:#}");
                FALLBACK_REPLY.to_string()
            }
        };
        self.chat_messages.push(ChatMessage {
            role: ChatRole::Assistant,
            content,
        });
        self.chat_loading = false;
        self.scroll_chat_to_bottom();
    }

    // Transcript scrolling

    pub fn chat_scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn chat_scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1);
    }

    /// Scroll the transcript so the newest message (or the thinking
    /// indicator) is visible.
    pub fn scroll_chat_to_bottom(&mut self) {
        // Use actual transcript width for wrap calculation, default if unset
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in &self.chat_messages {
            total_lines += 1; // Role line ("You:" or "AI:")
            for line in msg.content.lines() {
                // Character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        if self.chat_loading {
            total_lines += 2; // "AI:" + "Thinking..."
        }

        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };

        if total_lines > visible_height {
            self.chat_scroll = total_lines.saturating_sub(visible_height);
        }
    }

    /// Tick animation frame and decay the welcome notice (Tick event).
    pub fn tick(&mut self) {
        if self.chat_loading || self.is_submitting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        if self.welcome_notice.is_some() {
            self.welcome_ticks = self.welcome_ticks.saturating_sub(1);
            if self.welcome_ticks == 0 {
                self.welcome_notice = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn test_app() -> App {
        App::new(Config::new())
    }

    fn fill_sign_in(app: &mut App) {
        app.email_input = "a@b.com".to_string();
        app.password_input = "hunter2".to_string();
    }

    fn session() -> Session {
        Session {
            access_token: "tok".to_string(),
            token_type: Some("bearer".to_string()),
            user: None,
        }
    }

    #[test]
    fn toggle_twice_returns_to_original_mode_and_clears_error() {
        let mut app = test_app();
        app.auth_error = Some("bad credentials".to_string());
        assert_eq!(app.form_mode, FormMode::SignIn);

        app.toggle_form();
        assert_eq!(app.form_mode, FormMode::SignUp);
        assert_eq!(app.auth_error, None);
        assert_eq!(app.auth_field, AuthField::Name);

        app.toggle_form();
        assert_eq!(app.form_mode, FormMode::SignIn);
        assert_eq!(app.auth_field, AuthField::Email);
    }

    #[test]
    fn submit_with_missing_fields_sets_error_and_yields_no_request() {
        let mut app = test_app();
        app.email_input = "a@b.com".to_string();
        // password missing
        assert_eq!(app.submit_auth(), None);
        assert_eq!(app.auth_error.as_deref(), Some(MISSING_FIELDS));
        assert_eq!(app.form_mode, FormMode::SignIn);
        assert_eq!(app.screen, Screen::Auth);
    }

    #[test]
    fn sign_up_requires_name() {
        let mut app = test_app();
        app.toggle_form();
        fill_sign_in(&mut app);
        assert_eq!(app.submit_auth(), None);
        assert_eq!(app.auth_error.as_deref(), Some(MISSING_FIELDS));

        app.name_input = "Lena".to_string();
        let req = app.submit_auth();
        assert_eq!(
            req,
            Some(AuthRequest::SignUp {
                email: "a@b.com".to_string(),
                password: "hunter2".to_string(),
                name: "Lena".to_string(),
            })
        );
        assert_eq!(app.auth_error, None);
    }

    #[test]
    fn sign_in_does_not_require_name() {
        let mut app = test_app();
        fill_sign_in(&mut app);
        let req = app.submit_auth();
        assert_eq!(
            req,
            Some(AuthRequest::SignIn {
                email: "a@b.com".to_string(),
                password: "hunter2".to_string(),
            })
        );
    }

    #[test]
    fn successful_auth_navigates_to_chat_and_discards_credentials() {
        let mut app = test_app();
        fill_sign_in(&mut app);
        assert!(app.submit_auth().is_some());

        app.finish_auth(Ok(session()));
        assert_eq!(app.screen, Screen::Chat);
        assert!(app.session.is_some());
        assert!(app.email_input.is_empty());
        assert!(app.password_input.is_empty());
    }

    #[test]
    fn auth_failure_keeps_form_with_backend_message_verbatim() {
        let mut app = test_app();
        fill_sign_in(&mut app);
        assert!(app.submit_auth().is_some());

        app.finish_auth(Err(anyhow!("Invalid login credentials")));
        assert_eq!(app.screen, Screen::Auth);
        assert_eq!(app.form_mode, FormMode::SignIn);
        assert_eq!(app.auth_error.as_deref(), Some("Invalid login credentials"));
    }

    #[tokio::test]
    async fn submit_and_toggle_are_blocked_while_submitting() {
        let mut app = test_app();
        fill_sign_in(&mut app);
        app.auth_task = Some(tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Err(anyhow!("unreachable"))
        }));

        assert_eq!(app.submit_auth(), None);
        assert_eq!(app.auth_error, None);

        app.toggle_form();
        assert_eq!(app.form_mode, FormMode::SignIn);

        app.auth_task.take().unwrap().abort();
    }

    #[test]
    fn blank_send_is_a_no_op() {
        let mut app = test_app();
        app.chat_input = "   \t ".to_string();
        assert_eq!(app.begin_send(), None);
        assert!(app.chat_messages.is_empty());
        assert!(!app.chat_loading);
        // Input left alone so the user can keep editing
        assert_eq!(app.chat_input, "   \t ");
    }

    #[test]
    fn successful_sends_alternate_user_first_in_order() {
        let mut app = test_app();
        for i in 0..4 {
            app.chat_input = format!("question {i}");
            let prompt = app.begin_send().unwrap();
            assert_eq!(prompt, format!("question {i}"));
            assert!(app.chat_loading);
            assert!(app.chat_input.is_empty());
            app.finish_send(Ok(format!("answer {i}")));
            assert!(!app.chat_loading);
        }

        assert_eq!(app.chat_messages.len(), 8);
        for (i, msg) in app.chat_messages.iter().enumerate() {
            if i % 2 == 0 {
                assert_eq!(msg.role, ChatRole::User);
                assert_eq!(msg.content, format!("question {}", i / 2));
            } else {
                assert_eq!(msg.role, ChatRole::Assistant);
                assert_eq!(msg.content, format!("answer {}", i / 2));
            }
        }
    }

    #[tokio::test]
    async fn second_send_rejected_while_generation_outstanding() {
        let mut app = test_app();
        app.chat_input = "first".to_string();
        assert!(app.begin_send().is_some());
        app.chat_task = Some(tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Ok(String::new())
        }));

        app.chat_input = "second".to_string();
        assert_eq!(app.begin_send(), None);
        assert_eq!(app.chat_messages.len(), 1);

        app.chat_task.take().unwrap().abort();
    }

    #[test]
    fn generation_failure_appends_one_fallback_and_clears_loading() {
        let mut app = test_app();
        app.chat_input = "hello".to_string();
        assert!(app.begin_send().is_some());

        app.finish_send(Err(anyhow!("429 quota exceeded")));
        assert_eq!(app.chat_messages.len(), 2);
        assert_eq!(app.chat_messages[1].role, ChatRole::Assistant);
        assert_eq!(app.chat_messages[1].content, FALLBACK_REPLY);
        assert!(!app.chat_loading);
    }

    #[test]
    fn welcome_notice_shown_once_after_sign_up_then_decays() {
        let mut app = test_app();
        app.toggle_form();
        fill_sign_in(&mut app);
        app.name_input = "Lena".to_string();
        assert!(app.submit_auth().is_some());

        app.finish_auth(Ok(session()));
        assert_eq!(app.screen, Screen::Chat);
        assert_eq!(app.welcome_notice.as_deref(), Some("Welcome, Lena!"));
        assert_eq!(app.pending_welcome, None);

        for _ in 0..20 {
            app.tick();
        }
        assert_eq!(app.welcome_notice, None);

        // Re-entering chat without a new write never resurfaces it
        app.screen = Screen::Auth;
        app.enter_chat();
        assert_eq!(app.welcome_notice, None);
    }

    #[test]
    fn sign_in_success_writes_no_welcome() {
        let mut app = test_app();
        fill_sign_in(&mut app);
        assert!(app.submit_auth().is_some());
        app.finish_auth(Ok(session()));
        assert_eq!(app.welcome_notice, None);
        assert_eq!(app.pending_welcome, None);
    }

    #[test]
    fn field_cycling_matches_form_mode() {
        let mut app = test_app();
        assert_eq!(app.auth_field, AuthField::Email);
        app.next_auth_field();
        assert_eq!(app.auth_field, AuthField::Password);
        app.next_auth_field();
        assert_eq!(app.auth_field, AuthField::Email);

        app.toggle_form();
        assert_eq!(app.auth_field, AuthField::Name);
        app.next_auth_field();
        assert_eq!(app.auth_field, AuthField::Email);
        app.prev_auth_field();
        assert_eq!(app.auth_field, AuthField::Name);
        app.prev_auth_field();
        assert_eq!(app.auth_field, AuthField::Password);
    }
}
