//! The dashboard page: balance, this month's totals, the add-transaction form
//! and the transaction history.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, PreEscaped, html};
use rusqlite::Connection;
use rust_decimal::Decimal;
use time::{OffsetDateTime, UtcOffset};

use crate::{
    AppState, Error,
    display_balance::TICK_INTERVAL,
    endpoints::{self, format_endpoint},
    format::{datetime_local_value, format_currency, format_date, format_date_time, format_signed_amount},
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, CARD_STYLE, CATEGORY_BADGE_STYLE, EXPENSE_TEXT_STYLE,
        FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, HeadElement, INCOME_TEXT_STYLE, PAGE_CONTAINER_STYLE,
        base, submit_button,
    },
    navigation::NavBar,
    session::SessionRegistry,
    timezone::local_now,
    transaction::{
        CategoryExpense, DateRange, SqliteTransactionService, Transaction, TransactionService,
        TransactionSummary,
    },
    user::UserId,
};

/// The number of categories listed under this month's summary.
const TOP_CATEGORY_COUNT: usize = 5;

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for loading ledgers and monthly totals.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
    /// Where the signed in user's ledger is kept.
    pub sessions: SessionRegistry,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            sessions: state.sessions.clone(),
        }
    }
}

/// Everything the dashboard shows, gathered before rendering.
struct DashboardData {
    balance: Decimal,
    balance_frames: Vec<String>,
    transactions: Vec<Transaction>,
    month: DateRange,
    month_summary: TransactionSummary,
    top_categories: Vec<CategoryExpense>,
    now: OffsetDateTime,
}

/// Display the signed in user's balance, monthly totals and transactions.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserId>,
) -> Response {
    match build_dashboard_data(&state, user_id) {
        Ok(data) => dashboard_view(&data).into_response(),
        Err(error) => {
            tracing::error!("Could not display the dashboard for user {user_id}: {error}");
            error.into_response()
        }
    }
}

fn build_dashboard_data(state: &DashboardState, user_id: UserId) -> Result<DashboardData, Error> {
    let now = local_now(&state.local_timezone)
        .ok_or_else(|| Error::InvalidTimezoneError(state.local_timezone.clone()))?;
    let service = SqliteTransactionService::new(state.db_connection.clone());

    let (balance, frames, transactions) = state.sessions.with_session(user_id, &service, |session| {
        let frames = session.display_frames();
        let ledger = session.ledger();

        (ledger.balance(), frames, ledger.list().to_vec())
    })?;

    let month = DateRange::month_of(now.date());
    let month_summary = service.summary(user_id, &month)?;
    let mut top_categories = service.category_expenses(user_id, &month)?;
    top_categories.truncate(TOP_CATEGORY_COUNT);

    Ok(DashboardData {
        balance,
        balance_frames: frames.into_iter().map(format_currency).collect(),
        transactions,
        month,
        month_summary,
        top_categories,
        now,
    })
}

fn dashboard_view(data: &DashboardData) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            (balance_card(data.balance, &data.balance_frames))
            (month_summary_card(data))
            (add_transaction_form(data.now))
            (transaction_history(&data.transactions, data.now.offset()))
        }
    };

    base("Dashboard", &[balance_animation()], &content)
}

fn balance_card(balance: Decimal, frames: &[String]) -> Markup {
    // Frames are plain currency strings, so the JSON never contains markup.
    let frames_json = serde_json::to_string(frames).unwrap_or_else(|_| "[]".to_owned());
    let balance_style = if balance.is_sign_negative() && !balance.is_zero() {
        EXPENSE_TEXT_STYLE
    } else {
        INCOME_TEXT_STYLE
    };

    html! {
        section class=(CARD_STYLE)
        {
            h2 class="text-sm font-medium text-gray-500 dark:text-gray-400" { "Current Balance" }

            p
                id="balance"
                class={"text-4xl font-bold " (balance_style)}
                data-frames=(frames_json)
            {
                (format_currency(balance))
            }
        }
    }
}

/// Plays the balance card's frames once the page has loaded.
fn balance_animation() -> HeadElement {
    HeadElement::ScriptSource(PreEscaped(format!(
        "document.addEventListener('DOMContentLoaded', () => {{
            const balance = document.getElementById('balance');
            const frames = JSON.parse(balance.dataset.frames);
            let frame = 0;
            const timer = setInterval(() => {{
                if (frame >= frames.length) {{
                    clearInterval(timer);
                    return;
                }}
                balance.textContent = frames[frame];
                frame += 1;
            }}, {});
        }});",
        TICK_INTERVAL.as_millis()
    )))
}

fn month_summary_card(data: &DashboardData) -> Markup {
    let summary = &data.month_summary;
    let net_style = if summary.net.is_sign_negative() && !summary.net.is_zero() {
        EXPENSE_TEXT_STYLE
    } else {
        INCOME_TEXT_STYLE
    };

    html! {
        section id="month-summary" class=(CARD_STYLE)
        {
            h2 class="text-xl font-semibold mb-4"
            {
                "This Month"
                span class="ml-2 text-sm font-normal text-gray-500 dark:text-gray-400"
                {
                    (data.month.start()) " to " (data.month.end())
                }
            }

            dl class="grid grid-cols-3 gap-4 text-center"
            {
                div
                {
                    dt class="text-sm text-gray-500 dark:text-gray-400" { "Income" }
                    dd class={"text-lg font-semibold " (INCOME_TEXT_STYLE)} { (format_currency(summary.income)) }
                }
                div
                {
                    dt class="text-sm text-gray-500 dark:text-gray-400" { "Expenses" }
                    dd class={"text-lg font-semibold " (EXPENSE_TEXT_STYLE)} { (format_currency(summary.expenses)) }
                }
                div
                {
                    dt class="text-sm text-gray-500 dark:text-gray-400" { "Net" }
                    dd class={"text-lg font-semibold " (net_style)} { (format_currency(summary.net)) }
                }
            }

            @if !data.top_categories.is_empty()
            {
                h3 class="mt-6 mb-2 font-semibold" { "Top Spending Categories" }

                ul id="top-categories" class="space-y-1"
                {
                    @for expense in &data.top_categories
                    {
                        li class="flex justify-between"
                        {
                            span { (expense.category) }
                            span class=(EXPENSE_TEXT_STYLE) { (format_currency(expense.total)) }
                        }
                    }
                }
            }
        }
    }
}

fn add_transaction_form(now: OffsetDateTime) -> Markup {
    let now = datetime_local_value(now);

    html! {
        section class=(CARD_STYLE)
        {
            form
                hx-post=(endpoints::TRANSACTIONS_API)
                hx-target-error="#alert-container"
                hx-indicator="#indicator"
                hx-disabled-elt="#submit-button"
                class="w-full space-y-4"
            {
                h2 class="text-xl font-bold" { "Add Transaction" }

                div
                {
                    label for="name" class=(FORM_LABEL_STYLE) { "Name" }
                    input
                        name="name"
                        id="name"
                        type="text"
                        placeholder="Salary"
                        maxlength="100"
                        required
                        autofocus
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="amount" class=(FORM_LABEL_STYLE)
                    {
                        "Amount (start with + for income or - for an expense)"
                    }
                    input
                        name="amount"
                        id="amount"
                        type="text"
                        inputmode="decimal"
                        placeholder="+500 or -200"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="occurred_at" class=(FORM_LABEL_STYLE) { "Date and Time" }
                    input
                        name="occurred_at"
                        id="occurred_at"
                        type="datetime-local"
                        max=(now)
                        value=(now)
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="category" class=(FORM_LABEL_STYLE) { "Category" }
                    input
                        name="category"
                        id="category"
                        type="text"
                        placeholder="Groceries"
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="description" class=(FORM_LABEL_STYLE) { "Description" }
                    textarea
                        name="description"
                        id="description"
                        rows="2"
                        maxlength="255"
                        class=(FORM_TEXT_INPUT_STYLE)
                    {}
                }

                (submit_button("Add Transaction"))
            }
        }
    }
}

fn transaction_history(transactions: &[Transaction], local_offset: UtcOffset) -> Markup {
    html! {
        details id="transaction-history" class=(CARD_STYLE) open
        {
            summary class="text-xl font-bold cursor-pointer"
            {
                "Transaction History (" (transactions.len()) ")"
            }

            @if transactions.is_empty()
            {
                p class="mt-4 text-gray-500 dark:text-gray-400"
                {
                    "No transactions yet. Add your first transaction above!"
                }
            }
            @else
            {
                ul class="mt-4 divide-y divide-gray-200 dark:divide-gray-700"
                {
                    @for transaction in transactions
                    {
                        (transaction_row(transaction, local_offset))
                    }
                }
            }
        }
    }
}

fn transaction_row(transaction: &Transaction, local_offset: UtcOffset) -> Markup {
    let amount = transaction.amount.value();
    let amount_style = if transaction.amount.is_expense() {
        EXPENSE_TEXT_STYLE
    } else {
        INCOME_TEXT_STYLE
    };

    html! {
        li class="py-3 flex justify-between items-start gap-4" data-transaction-id=(transaction.id)
        {
            div class="min-w-0"
            {
                p class="font-semibold"
                {
                    (transaction.name)

                    @if let Some(category) = &transaction.category
                    {
                        " "
                        span class=(CATEGORY_BADGE_STYLE) { (category) }
                    }
                }

                @if !transaction.description.is_empty()
                {
                    p class="text-sm text-gray-600 dark:text-gray-300" { (transaction.description) }
                }

                p
                    class="text-xs text-gray-500 dark:text-gray-400"
                    title=(format_date(transaction.occurred_at))
                {
                    (format_date_time(transaction.occurred_at))
                }
            }

            div class="flex flex-col items-end shrink-0"
            {
                span class={"font-semibold " (amount_style)} { (format_signed_amount(amount)) }

                button
                    hx-delete=(format_endpoint(endpoints::TRANSACTION, transaction.id))
                    hx-confirm={"Are you sure you want to delete '" (transaction.name) "'?"}
                    hx-target-error="#alert-container"
                    class=(BUTTON_DELETE_STYLE)
                {
                    "Delete"
                }

                (edit_transaction_form(transaction, local_offset))
            }
        }
    }
}

/// The amount as typed into the forms, with an explicit sign.
fn signed_amount_input(amount: Decimal) -> String {
    if amount.is_sign_negative() {
        amount.to_string()
    } else {
        format!("+{amount}")
    }
}

/// A collapsed form that replaces every field of `transaction`.
fn edit_transaction_form(transaction: &Transaction, local_offset: UtcOffset) -> Markup {
    let id = transaction.id;
    let field_id = |field: &str| format!("edit-{id}-{field}");
    let occurred_at = datetime_local_value(transaction.occurred_at.to_offset(local_offset));

    html! {
        details class="mt-2 text-left"
        {
            summary class="text-sm cursor-pointer text-blue-600 dark:text-blue-500" { "Edit" }

            form
                hx-put=(format_endpoint(endpoints::TRANSACTION, id))
                hx-target-error="#alert-container"
                class="mt-2 w-64 space-y-2"
            {
                label for=(field_id("name")) class=(FORM_LABEL_STYLE) { "Name" }
                input
                    name="name"
                    id=(field_id("name"))
                    type="text"
                    value=(transaction.name)
                    maxlength="100"
                    required
                    class=(FORM_TEXT_INPUT_STYLE);

                label for=(field_id("amount")) class=(FORM_LABEL_STYLE) { "Amount" }
                input
                    name="amount"
                    id=(field_id("amount"))
                    type="text"
                    inputmode="decimal"
                    value=(signed_amount_input(transaction.amount.value()))
                    required
                    class=(FORM_TEXT_INPUT_STYLE);

                label for=(field_id("occurred_at")) class=(FORM_LABEL_STYLE) { "Date and Time" }
                input
                    name="occurred_at"
                    id=(field_id("occurred_at"))
                    type="datetime-local"
                    value=(occurred_at)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);

                label for=(field_id("category")) class=(FORM_LABEL_STYLE) { "Category" }
                input
                    name="category"
                    id=(field_id("category"))
                    type="text"
                    value=[transaction.category.as_deref()]
                    class=(FORM_TEXT_INPUT_STYLE);

                label for=(field_id("description")) class=(FORM_LABEL_STYLE) { "Description" }
                textarea
                    name="description"
                    id=(field_id("description"))
                    rows="2"
                    maxlength="255"
                    class=(FORM_TEXT_INPUT_STYLE)
                {
                    (transaction.description)
                }

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Save" }
            }
        }
    }
}
