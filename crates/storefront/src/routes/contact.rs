//! Contact form route handlers.
//!
//! Messages are not stored or forwarded anywhere: a valid submission is
//! written to the log and the visitor sees a thank-you note.

use askama::Template;
use askama_web::WebTemplate;
use axum::Form;
use serde::Deserialize;
use tracing::instrument;

use thrivo_core::Email;

use crate::error::Result;
use crate::filters;
use crate::middleware::SessionContext;
use crate::models::Flash;
use crate::views::{Nav, PageChrome};

/// Contact form data.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

impl ContactForm {
    fn validate(&self) -> std::result::Result<Email, &'static str> {
        if [&self.name, &self.email, &self.message]
            .iter()
            .any(|v| v.trim().is_empty())
        {
            return Err("Please fill in your name, email and message.");
        }
        Email::parse(&self.email).map_err(|_| "Please enter a valid email address.")
    }
}

/// Contact page template.
#[derive(Template, WebTemplate)]
#[template(path = "contact.html")]
pub struct ContactTemplate {
    pub nav: Nav,
    pub flash: Option<Flash>,
    pub form: ContactForm,
    pub error: Option<String>,
    pub sent: bool,
}

/// Display the contact form.
pub async fn show(ctx: SessionContext) -> Result<ContactTemplate> {
    let PageChrome { nav, flash } = PageChrome::take(&ctx, "contact").await?;
    let form = ContactForm {
        email: ctx
            .user()
            .map(|u| u.email.as_str().to_string())
            .unwrap_or_default(),
        ..ContactForm::default()
    };

    Ok(ContactTemplate {
        nav,
        flash,
        form,
        error: None,
        sent: false,
    })
}

/// Handle a contact form submission.
#[instrument(skip(ctx, form), fields(subject = %form.subject))]
pub async fn submit(ctx: SessionContext, Form(form): Form<ContactForm>) -> Result<ContactTemplate> {
    let PageChrome { nav, flash } = PageChrome::take(&ctx, "contact").await?;

    match form.validate() {
        Ok(email) => {
            tracing::info!(
                name = %form.name.trim(),
                email = %email,
                message_len = form.message.len(),
                "contact message received"
            );
            Ok(ContactTemplate {
                nav,
                flash,
                form: ContactForm::default(),
                error: None,
                sent: true,
            })
        }
        Err(reason) => Ok(ContactTemplate {
            nav,
            flash,
            form,
            error: Some(reason.to_string()),
            sent: false,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(name: &str, email: &str, message: &str) -> ContactForm {
        ContactForm {
            name: name.to_string(),
            email: email.to_string(),
            subject: String::new(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_validate() {
        assert!(form("Sana", "sana@example.com", "Hi").validate().is_ok());
        assert!(form("", "sana@example.com", "Hi").validate().is_err());
        assert!(form("Sana", "not-an-email", "Hi").validate().is_err());
        assert!(form("Sana", "sana@example.com", "   ").validate().is_err());
    }
}
