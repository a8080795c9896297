use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::UserMetadata;

static EMAIL_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    SignIn,
    SignUp,
}

impl AuthMode {
    pub fn title(&self) -> &'static str {
        match self {
            AuthMode::SignIn => "Welcome Back",
            AuthMode::SignUp => "Create Account",
        }
    }

    pub fn subtitle(&self) -> &'static str {
        match self {
            AuthMode::SignIn => "Sign in to continue to your social space",
            AuthMode::SignUp => "Join our social community today",
        }
    }

    pub fn submit_label(&self) -> &'static str {
        match self {
            AuthMode::SignIn => "Sign In",
            AuthMode::SignUp => "Sign Up",
        }
    }

    pub fn toggle_label(&self) -> &'static str {
        match self {
            AuthMode::SignIn => "Create New Account",
            AuthMode::SignUp => "Already have an account? Sign In",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFocus {
    FirstName,
    LastName,
    Email,
    Password,
    Submit,
    Toggle,
}

/// State of the sign-in / sign-up form
pub struct AuthFormState {
    pub mode: AuthMode,
    pub focus: AuthFocus,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    /// Set while a request is in flight; the submit button is disabled.
    pub submitting: bool,
}

impl Default for AuthFormState {
    fn default() -> Self {
        Self {
            mode: AuthMode::SignIn,
            focus: AuthFocus::Email,
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            password: String::new(),
            submitting: false,
        }
    }
}

impl AuthFormState {
    pub fn focus_order(&self) -> &'static [AuthFocus] {
        match self.mode {
            AuthMode::SignIn => &[AuthFocus::Email, AuthFocus::Password, AuthFocus::Submit, AuthFocus::Toggle],
            AuthMode::SignUp => &[
                AuthFocus::FirstName,
                AuthFocus::LastName,
                AuthFocus::Email,
                AuthFocus::Password,
                AuthFocus::Submit,
                AuthFocus::Toggle,
            ],
        }
    }

    pub fn focus_next(&mut self) {
        let order = self.focus_order();
        let idx = order.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = order[(idx + 1) % order.len()];
    }

    pub fn focus_prev(&mut self) {
        let order = self.focus_order();
        let idx = order.iter().position(|f| *f == self.focus).unwrap_or(0);
        self.focus = order[(idx + order.len() - 1) % order.len()];
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        };
        self.focus = self.focus_order()[0];
    }

    /// The text field under focus, if any.
    pub fn focused_input(&mut self) -> Option<&mut String> {
        match self.focus {
            AuthFocus::FirstName => Some(&mut self.first_name),
            AuthFocus::LastName => Some(&mut self.last_name),
            AuthFocus::Email => Some(&mut self.email),
            AuthFocus::Password => Some(&mut self.password),
            AuthFocus::Submit | AuthFocus::Toggle => None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err("Email and password are required.".to_string());
        }
        let well_formed = EMAIL_RE.as_ref().map_or(true, |re| re.is_match(self.email.trim()));
        if !well_formed {
            return Err("Please enter a valid email address.".to_string());
        }
        Ok(())
    }

    pub fn metadata(&self) -> UserMetadata {
        let non_empty = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
        UserMetadata {
            first_name: non_empty(&self.first_name),
            last_name: non_empty(&self.last_name),
            avatar_url: None,
        }
    }

    pub fn clear_inputs(&mut self) {
        self.first_name.clear();
        self.last_name.clear();
        self.email.clear();
        self.password.clear();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_switches_copy_and_focus() {
        let mut form = AuthFormState::default();
        assert_eq!(form.mode.title(), "Welcome Back");
        form.toggle_mode();
        assert_eq!(form.mode.title(), "Create Account");
        assert_eq!(form.mode.submit_label(), "Sign Up");
        assert_eq!(form.focus, AuthFocus::FirstName);
        form.toggle_mode();
        assert_eq!(form.mode.toggle_label(), "Create New Account");
        assert_eq!(form.focus, AuthFocus::Email);
    }

    #[test]
    fn focus_cycles_within_mode() {
        let mut form = AuthFormState::default();
        form.focus_prev();
        assert_eq!(form.focus, AuthFocus::Toggle);
        form.focus_next();
        form.focus_next();
        assert_eq!(form.focus, AuthFocus::Password);
    }

    #[test]
    fn validation() {
        let mut form = AuthFormState::default();
        assert!(form.validate().is_err());
        form.email = "not-an-email".into();
        form.password = "secret".into();
        assert_eq!(form.validate(), Err("Please enter a valid email address.".to_string()));
        form.email = "ana@example.com".into();
        assert!(form.validate().is_ok());
    }

    #[test]
    fn blank_names_become_none() {
        let form = AuthFormState { first_name: "  Ana ".into(), ..AuthFormState::default() };
        let meta = form.metadata();
        assert_eq!(meta.first_name.as_deref(), Some("Ana"));
        assert_eq!(meta.last_name, None);
    }
}
