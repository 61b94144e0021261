//! Translated copy for transactional emails.

use territory_core::Locale;

use super::MessageKind;

/// Text blocks of one message in one locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageContent {
    pub subject: &'static str,
    pub title: &'static str,
    /// Greeting; `{name}` is replaced with the recipient's name.
    pub greeting: &'static str,
    pub paragraphs: &'static [&'static str],
    pub button: &'static str,
    pub footnote: &'static str,
}

const CONFIRMATION_GB: MessageContent = MessageContent {
    subject: "Confirm your email address",
    title: "Welcome to Territories",
    greeting: "Hello {name},",
    paragraphs: &[
        "Thank you for creating an account.",
        "Please confirm your email address to finish setting it up.",
    ],
    button: "Confirm my email",
    footnote: "If you did not create an account, you can ignore this email.",
};

const CONFIRMATION_FR: MessageContent = MessageContent {
    subject: "Confirmez votre adresse e-mail",
    title: "Bienvenue sur Territoires",
    greeting: "Bonjour {name},",
    paragraphs: &[
        "Merci d'avoir créé un compte.",
        "Veuillez confirmer votre adresse e-mail pour terminer son activation.",
    ],
    button: "Confirmer mon e-mail",
    footnote: "Si vous n'avez pas créé de compte, vous pouvez ignorer cet e-mail.",
};

const RESET_GB: MessageContent = MessageContent {
    subject: "Reset your password",
    title: "Password reset",
    greeting: "Hello {name},",
    paragraphs: &[
        "We received a request to reset the password of your account.",
        "Use the button below to choose a new one. The link expires soon and can only be used once.",
    ],
    button: "Reset my password",
    footnote: "If you did not ask for a new password, you can ignore this email.",
};

const RESET_FR: MessageContent = MessageContent {
    subject: "Réinitialisez votre mot de passe",
    title: "Réinitialisation du mot de passe",
    greeting: "Bonjour {name},",
    paragraphs: &[
        "Nous avons reçu une demande de réinitialisation du mot de passe de votre compte.",
        "Utilisez le bouton ci-dessous pour en choisir un nouveau. Le lien expire bientôt et ne peut servir qu'une fois.",
    ],
    button: "Réinitialiser mon mot de passe",
    footnote: "Si vous n'avez pas demandé de nouveau mot de passe, vous pouvez ignorer cet e-mail.",
};

/// Copy for `kind` in `locale`.
#[must_use]
pub const fn content(kind: MessageKind, locale: Locale) -> &'static MessageContent {
    match (kind, locale) {
        (MessageKind::Confirmation, Locale::Gb) => &CONFIRMATION_GB,
        (MessageKind::Confirmation, Locale::Fr) => &CONFIRMATION_FR,
        (MessageKind::Reset, Locale::Gb) => &RESET_GB,
        (MessageKind::Reset, Locale::Fr) => &RESET_FR,
    }
}

/// Footer line following the copyright year.
#[must_use]
pub const fn all_rights(locale: Locale) -> &'static str {
    match locale {
        Locale::Gb => "All rights reserved.",
        Locale::Fr => "Tous droits réservés.",
    }
}
