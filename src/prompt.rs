//! Interactive prompts for credentials and menu choices
//!
//! Kept apart from the flows so every flow can be driven by parameters
//! alone in tests. Each prompt only fires for values the operator did not
//! already supply on the command line.

use dialoguer::{theme::ColorfulTheme, Input, Password};

use crate::Result;

/// Operator credentials, possibly partial
#[derive(Debug, Default, Clone)]
pub struct Credentials {
    pub api_id: Option<i32>,
    pub api_hash: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}

/// Credentials with every required field present
#[derive(Debug, Clone)]
pub struct ResolvedCredentials {
    pub api_id: i32,
    pub api_hash: String,
    pub phone: String,
    /// 2FA password, `None` when the account has none
    pub password: Option<String>,
}

impl Credentials {
    /// Fill in missing fields interactively.
    pub fn resolve(self) -> Result<ResolvedCredentials> {
        let theme = ColorfulTheme::default();

        let api_id = match self.api_id {
            Some(id) => id,
            None => Input::with_theme(&theme)
                .with_prompt("Enter your API ID")
                .interact_text()?,
        };

        let api_hash = match self.api_hash {
            Some(hash) => hash,
            None => Input::with_theme(&theme)
                .with_prompt("Enter your API HASH")
                .interact_text()?,
        };

        let phone = match self.phone {
            Some(phone) => phone,
            None => Input::with_theme(&theme)
                .with_prompt("Enter your phone number (e.g. +1234567890)")
                .interact_text()?,
        };

        let password = match self.password {
            Some(password) => Some(password),
            None => {
                let entered: String = Password::with_theme(&theme)
                    .with_prompt("Enter 2-Step Verification password (press Enter if you don't have it)")
                    .allow_empty_password(true)
                    .interact()?;
                if entered.is_empty() {
                    None
                } else {
                    Some(entered)
                }
            }
        };

        Ok(ResolvedCredentials {
            api_id,
            api_hash,
            phone,
            password,
        })
    }
}

/// Prompt for an integer value.
pub fn int_input(prompt: &str) -> Result<i32> {
    Ok(Input::<i32>::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact_text()?)
}

/// Prompt for a password, hidden while typing.
pub fn password(prompt: &str) -> Result<String> {
    Ok(Password::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact()?)
}

/// Prompt for a free-form line of input.
pub fn input(prompt: &str) -> Result<String> {
    Ok(Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact_text()?)
}

/// Prompt for a numbered menu choice, returned verbatim.
pub fn choice(prompt: &str) -> Result<String> {
    Ok(Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact_text()
        .map(|s| s.trim().to_string())?)
}
