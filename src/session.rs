//! A signed-in user's ledger and the registry of open sessions.
//!
//! Each mutation is applied to the in-memory ledger first and then mirrored to
//! the [TransactionService]. If the service fails, the ledger change is undone
//! so that the two never disagree.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::{
    Error,
    display_balance::DisplayBalance,
    ledger::Ledger,
    transaction::{Page, Transaction, TransactionForm, TransactionId, TransactionService},
    user::UserId,
};

/// The ledger of one signed-in user.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    user_id: UserId,
    ledger: Ledger,
    display_balance: DisplayBalance,
}

impl Session {
    /// Load every stored transaction of `user_id` into a new session.
    ///
    /// The displayed balance starts at zero so the first dashboard view
    /// counts up to the balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the transactions could not be loaded.
    pub fn open(user_id: UserId, service: &impl TransactionService) -> Result<Self, Error> {
        let mut transactions = Vec::new();
        let mut page = Page::default();

        loop {
            let batch = service.list(user_id, page)?;
            let is_last_page = (batch.len() as u64) < page.limit;
            transactions.extend(batch);

            if is_last_page {
                break;
            }

            page = page.next();
        }

        let ledger = Ledger::from_transactions(transactions)?;
        tracing::debug!(
            "Opened session for user {user_id} with {} transactions",
            ledger.len()
        );

        Ok(Self {
            user_id,
            ledger,
            display_balance: DisplayBalance::new(Decimal::ZERO),
        })
    }

    /// The user this session belongs to.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// The user's ledger.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Validate and add a transaction, then store it.
    ///
    /// # Errors
    ///
    /// Returns [Error::Validation] if `form` is invalid, or the service error
    /// if the transaction could not be stored. The ledger is unchanged in
    /// both cases.
    pub fn add_transaction(
        &mut self,
        form: &TransactionForm,
        now: OffsetDateTime,
        service: &impl TransactionService,
    ) -> Result<Transaction, Error> {
        let transaction = self.ledger.add(form, now)?;

        if let Err(error) = service.insert(self.user_id, &transaction) {
            tracing::error!(
                "Could not store transaction {} for user {}: {error}. Rolling back.",
                transaction.id,
                self.user_id
            );
            self.ledger.undo_add(transaction.id);
            return Err(error);
        }

        tracing::info!(
            "User {} added transaction {} ({})",
            self.user_id,
            transaction.id,
            transaction.amount
        );

        Ok(transaction)
    }

    /// Delete a transaction from storage and then from the ledger.
    ///
    /// Returns `Ok(None)` if the ledger does not hold a transaction with `id`.
    ///
    /// # Errors
    ///
    /// Returns the service error if the transaction could not be deleted. The
    /// ledger is unchanged in that case.
    pub fn remove_transaction(
        &mut self,
        id: TransactionId,
        service: &impl TransactionService,
    ) -> Result<Option<Transaction>, Error> {
        if self.ledger.get(id).is_none() {
            return Ok(None);
        }

        service.delete(self.user_id, id)?;
        let removed = self.ledger.remove(id);

        tracing::info!("User {} removed transaction {id}", self.user_id);

        Ok(removed)
    }

    /// Replace a transaction in the ledger, then store the change.
    ///
    /// # Errors
    ///
    /// Returns [Error::NotFound] if the ledger does not hold a transaction with
    /// `id`, [Error::Validation] if `form` is invalid, or the service error if
    /// the change could not be stored. The ledger is unchanged in all cases.
    pub fn update_transaction(
        &mut self,
        id: TransactionId,
        form: &TransactionForm,
        now: OffsetDateTime,
        service: &impl TransactionService,
    ) -> Result<Transaction, Error> {
        let previous = self.ledger.get(id).cloned().ok_or(Error::NotFound)?;
        let transaction = self.ledger.replace(id, form, now)?;

        if let Err(error) = service.update(self.user_id, &transaction) {
            tracing::error!(
                "Could not update transaction {id} for user {}: {error}. Rolling back.",
                self.user_id
            );
            self.ledger.swap(previous);
            return Err(error);
        }

        tracing::info!("User {} updated transaction {id}", self.user_id);

        Ok(transaction)
    }

    /// The balance values to animate through, from the value shown last time
    /// to the current balance.
    ///
    /// Afterwards the current balance counts as shown.
    pub fn display_frames(&mut self) -> Vec<Decimal> {
        self.display_balance.retarget(self.ledger.balance());
        self.display_balance.frames()
    }
}

/// The open sessions of every signed-in user.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry(Arc<Mutex<HashMap<UserId, Session>>>);

impl SessionRegistry {
    /// Create a registry with no open sessions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a fresh session for `user_id`, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if the user's transactions could not be loaded.
    pub fn open(&self, user_id: UserId, service: &impl TransactionService) -> Result<(), Error> {
        let mut sessions = self.0.lock().map_err(|_| Error::SessionLockError)?;
        let session = Session::open(user_id, service)?;
        sessions.insert(user_id, session);

        Ok(())
    }

    /// Run `f` with the session of `user_id`.
    ///
    /// The session is opened first if it is not open yet, e.g. after the
    /// server restarted while the user's cookie was still valid.
    ///
    /// # Errors
    ///
    /// Returns [Error::SessionLockError] if the registry lock is poisoned, or
    /// an error if the session could not be opened.
    pub fn with_session<T>(
        &self,
        user_id: UserId,
        service: &impl TransactionService,
        f: impl FnOnce(&mut Session) -> T,
    ) -> Result<T, Error> {
        let mut sessions = self.0.lock().map_err(|_| Error::SessionLockError)?;

        let session = match sessions.entry(user_id) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(Session::open(user_id, service)?)
            }
        };

        Ok(f(session))
    }

    /// Discard the session of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [Error::SessionLockError] if the registry lock is poisoned.
    pub fn close(&self, user_id: UserId) -> Result<(), Error> {
        let mut sessions = self.0.lock().map_err(|_| Error::SessionLockError)?;
        sessions.remove(&user_id);

        Ok(())
    }

    /// Whether `user_id` has an open session.
    pub fn is_open(&self, user_id: UserId) -> bool {
        self.0
            .lock()
            .map(|sessions| sessions.contains_key(&user_id))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod session_tests {
    use std::{
        cell::Cell,
        sync::{Arc, Mutex},
    };

    use rusqlite::Connection;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::{Duration, OffsetDateTime, macros::datetime};

    use crate::{
        Error,
        transaction::{
            CategoryExpense, DateRange, Page, SqliteTransactionService, Transaction,
            TransactionForm, TransactionId, TransactionService, TransactionSummary,
            create_transaction_table,
        },
        user::UserId,
    };

    use super::{Session, SessionRegistry};

    const USER: UserId = UserId::new(1);

    fn now() -> OffsetDateTime {
        datetime!(2025-10-16 14:30:00 +05:30)
    }

    fn form(name: &str, amount: &str) -> TransactionForm {
        TransactionForm {
            name: name.to_owned(),
            amount: amount.to_owned(),
            occurred_at: "2025-10-15T10:00".to_owned(),
            ..Default::default()
        }
    }

    fn get_service() -> SqliteTransactionService {
        let connection = Connection::open_in_memory().unwrap();
        create_transaction_table(&connection).unwrap();

        SqliteTransactionService::new(Arc::new(Mutex::new(connection)))
    }

    /// Delegates to a real service but fails writes when told to.
    struct FlakyService {
        inner: SqliteTransactionService,
        fail_writes: Cell<bool>,
    }

    impl FlakyService {
        fn new() -> Self {
            Self {
                inner: get_service(),
                fail_writes: Cell::new(false),
            }
        }

        fn check(&self) -> Result<(), Error> {
            if self.fail_writes.get() {
                Err(Error::DatabaseLockError)
            } else {
                Ok(())
            }
        }
    }

    impl TransactionService for FlakyService {
        fn insert(&self, owner: UserId, transaction: &Transaction) -> Result<(), Error> {
            self.check()?;
            self.inner.insert(owner, transaction)
        }

        fn list(&self, owner: UserId, page: Page) -> Result<Vec<Transaction>, Error> {
            self.inner.list(owner, page)
        }

        fn update(&self, owner: UserId, transaction: &Transaction) -> Result<(), Error> {
            self.check()?;
            self.inner.update(owner, transaction)
        }

        fn delete(&self, owner: UserId, id: TransactionId) -> Result<(), Error> {
            self.check()?;
            self.inner.delete(owner, id)
        }

        fn balance(&self, owner: UserId) -> Result<Decimal, Error> {
            self.inner.balance(owner)
        }

        fn summary(&self, owner: UserId, range: &DateRange) -> Result<TransactionSummary, Error> {
            self.inner.summary(owner, range)
        }

        fn category_expenses(
            &self,
            owner: UserId,
            range: &DateRange,
        ) -> Result<Vec<CategoryExpense>, Error> {
            self.inner.category_expenses(owner, range)
        }
    }

    #[test]
    fn added_transactions_are_stored_and_reloaded() {
        let service = get_service();
        let mut session = Session::open(USER, &service).unwrap();

        session.add_transaction(&form("Salary", "+50000"), now(), &service).unwrap();
        session.add_transaction(&form("Rent", "-15000"), now(), &service).unwrap();

        let reopened = Session::open(USER, &service).unwrap();
        assert_eq!(reopened.ledger().list(), session.ledger().list());
        assert_eq!(reopened.ledger().balance(), dec!(35000));
        assert_eq!(service.balance(USER), Ok(dec!(35000)));
    }

    #[test]
    fn open_reads_every_page() {
        let service = get_service();
        let mut session = Session::open(USER, &service).unwrap();
        let count = Page::default().limit + 7;

        for _ in 0..count {
            session.add_transaction(&form("Coffee", "-1"), now(), &service).unwrap();
        }

        let reopened = Session::open(USER, &service).unwrap();
        assert_eq!(reopened.ledger().len() as u64, count);
        assert_eq!(reopened.ledger().balance(), -Decimal::from(count));
    }

    #[test]
    fn failed_insert_rolls_back_ledger() {
        let service = FlakyService::new();
        let mut session = Session::open(USER, &service).unwrap();
        session.add_transaction(&form("Salary", "+100"), now(), &service).unwrap();
        let before = session.ledger().clone();

        service.fail_writes.set(true);
        let result = session.add_transaction(&form("Rent", "-50"), now(), &service);

        assert_eq!(result, Err(Error::DatabaseLockError));
        assert_eq!(session.ledger(), &before);
    }

    #[test]
    fn failed_insert_does_not_use_up_an_id() {
        let service = FlakyService::new();
        let mut session = Session::open(USER, &service).unwrap();
        let salary = session.add_transaction(&form("Salary", "+100"), now(), &service).unwrap();

        service.fail_writes.set(true);
        session
            .add_transaction(&form("Rent", "-50"), now(), &service)
            .unwrap_err();
        service.fail_writes.set(false);
        let rent = session.add_transaction(&form("Rent", "-50"), now(), &service).unwrap();

        assert_eq!(rent.id, salary.id + 1);
    }

    #[test]
    fn huge_amounts_are_rejected_without_locking_out_other_users() {
        let service = get_service();
        let registry = SessionRegistry::new();
        let huge = form("Lottery", "+79228162514264337593543950335");

        for _ in 0..2 {
            let result = registry
                .with_session(USER, &service, |session| {
                    session.add_transaction(&huge, now(), &service)
                })
                .unwrap();

            assert!(matches!(result, Err(Error::Validation(_))));
        }

        let other_balance = registry.with_session(UserId::new(2), &service, |session| {
            session.ledger().balance()
        });
        assert_eq!(other_balance, Ok(Decimal::ZERO));
    }

    #[test]
    fn failed_delete_keeps_transaction() {
        let service = FlakyService::new();
        let mut session = Session::open(USER, &service).unwrap();
        let salary = session.add_transaction(&form("Salary", "+100"), now(), &service).unwrap();

        service.fail_writes.set(true);
        let result = session.remove_transaction(salary.id, &service);

        assert_eq!(result, Err(Error::DatabaseLockError));
        assert_eq!(session.ledger().balance(), dec!(100));
    }

    #[test]
    fn failed_update_restores_previous_transaction() {
        let service = FlakyService::new();
        let mut session = Session::open(USER, &service).unwrap();
        let salary = session.add_transaction(&form("Salary", "+100"), now(), &service).unwrap();

        service.fail_writes.set(true);
        let result = session.update_transaction(salary.id, &form("Salary", "+200"), now(), &service);

        assert_eq!(result, Err(Error::DatabaseLockError));
        assert_eq!(session.ledger().get(salary.id), Some(&salary));
        assert_eq!(session.ledger().balance(), dec!(100));
    }

    #[test]
    fn update_is_stored() {
        let service = get_service();
        let mut session = Session::open(USER, &service).unwrap();
        let salary = session.add_transaction(&form("Salary", "+100"), now(), &service).unwrap();

        let updated = session
            .update_transaction(salary.id, &form("Salary", "+200"), now(), &service)
            .unwrap();

        assert_eq!(session.ledger().balance(), dec!(200));
        assert_eq!(service.list(USER, Page::default()), Ok(vec![updated]));
    }

    #[test]
    fn remove_absent_transaction_returns_none() {
        let service = get_service();
        let mut session = Session::open(USER, &service).unwrap();

        assert_eq!(session.remove_transaction(99, &service), Ok(None));
    }

    #[test]
    fn remove_deletes_from_storage() {
        let service = get_service();
        let mut session = Session::open(USER, &service).unwrap();
        let salary = session.add_transaction(&form("Salary", "+100"), now(), &service).unwrap();

        let removed = session.remove_transaction(salary.id, &service).unwrap();

        assert_eq!(removed, Some(salary));
        assert!(session.ledger().is_empty());
        assert_eq!(service.list(USER, Page::default()), Ok(vec![]));
    }

    #[test]
    fn invalid_form_is_not_stored() {
        let service = get_service();
        let mut session = Session::open(USER, &service).unwrap();
        let mut future = form("Rent", "-10");
        future.occurred_at = (now() + Duration::days(1))
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap();

        let result = session.add_transaction(&future, now(), &service);

        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(service.list(USER, Page::default()), Ok(vec![]));
    }

    #[test]
    fn display_frames_animate_from_last_shown_balance() {
        let service = get_service();
        let mut session = Session::open(USER, &service).unwrap();
        session.add_transaction(&form("Salary", "+1000"), now(), &service).unwrap();

        let frames = session.display_frames();
        assert_eq!(frames.first(), Some(&dec!(50)));
        assert_eq!(frames.last(), Some(&dec!(1000)));

        assert!(session.display_frames().is_empty());

        session.add_transaction(&form("Rent", "-20"), now(), &service).unwrap();
        let frames = session.display_frames();
        assert_eq!(frames.first(), Some(&dec!(999)));
        assert_eq!(frames.last(), Some(&dec!(980)));
        assert_eq!(frames.len(), 20);
    }

    #[test]
    fn registry_opens_sessions_lazily_and_closes_them() {
        let service = get_service();
        let registry = SessionRegistry::new();
        assert!(!registry.is_open(USER));

        let balance = registry
            .with_session(USER, &service, |session| {
                session
                    .add_transaction(&form("Salary", "+10"), now(), &service)
                    .map(|_| session.ledger().balance())
            })
            .unwrap();

        assert_eq!(balance, Ok(dec!(10)));
        assert!(registry.is_open(USER));

        registry.close(USER).unwrap();
        assert!(!registry.is_open(USER));
    }
}
