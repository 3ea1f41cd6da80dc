//! Alert messages that are swapped into the page by htmx after a request.

use maud::{Markup, html};

/// A dismissable message shown at the bottom of the page.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// Something the user asked for worked.
    Success {
        /// The headline of the alert.
        message: String,
        /// Further explanation, may be empty.
        details: String,
    },
    /// Something the user asked for failed.
    Error {
        /// The headline of the alert.
        message: String,
        /// What went wrong and how to fix it, may be empty.
        details: String,
    },
}

impl Alert {
    /// Render the alert as an out-of-band swap for the alert container.
    pub fn into_html(self) -> Markup {
        let (container_style, message, details) = match &self {
            Alert::Success { message, details } => (
                "p-4 mb-4 text-sm text-green-800 border border-green-300 rounded-lg \
                bg-green-50 dark:bg-gray-800 dark:text-green-400 dark:border-green-800",
                message,
                details,
            ),
            Alert::Error { message, details } => (
                "p-4 mb-4 text-sm text-red-800 border border-red-300 rounded-lg \
                bg-red-50 dark:bg-gray-800 dark:text-red-400 dark:border-red-800",
                message,
                details,
            ),
        };

        html! {
            div
                id="alert-container"
                hx-swap-oob="true"
                class="w-full max-w-md px-4"
                style="position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;"
            {
                div class=(container_style) role="alert"
                {
                    div class="flex items-start justify-between gap-x-3"
                    {
                        div
                        {
                            span class="font-semibold" { (message) }

                            @if !details.is_empty() {
                                p class="mt-1" { (details) }
                            }
                        }

                        button
                            type="button"
                            aria-label="Dismiss"
                            class="font-bold"
                            onclick="this.closest('#alert-container').classList.add('hidden')"
                        {
                            "×"
                        }
                    }
                }
            }
        }
    }
}
