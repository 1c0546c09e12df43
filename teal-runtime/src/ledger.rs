//! # Ledger Adapter
//!
//! The interpreter reads transaction and global context and reads and
//! writes application state through the [`Ledger`] trait. The interpreter
//! holds the ledger as `&mut L` for the length of one run. A run opens with
//! [`Ledger::checkpoint`] and ends with [`Ledger::commit`] when approved or
//! [`Ledger::rollback`] otherwise, so a rejected or errored run leaves the
//! ledger as it found it.
//!
//! [`InMemoryLedger`] is a self-contained implementation holding accounts,
//! applications and the transaction group being evaluated.

use crate::error::LedgerError;
use crate::txn::{application_address, Address, Transaction, TxnType};
use sha2::{Digest, Sha512_256};
use std::collections::{BTreeMap, HashMap};
use teal_spec::{GlobalField, StackValue, MAX_VERSION};

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Protocol parameters exposed through `global`
pub const MIN_TXN_FEE: u64 = 1000;
pub const MIN_BALANCE: u64 = 100_000;
pub const MAX_TXN_LIFE: u64 = 1000;

/// Minimum balance added per opted-in or created application
pub const APP_FLAT_MIN_BALANCE: u64 = 100_000;
/// Minimum balance added per state entry
pub const SCHEMA_UINT_MIN_BALANCE: u64 = 28_500;
pub const SCHEMA_BYTES_MIN_BALANCE: u64 = 50_000;

/// State key limits
pub const MAX_KEY_LENGTH: usize = 64;
pub const MAX_KEY_VALUE_LENGTH: usize = 128;

/// Ledger/context adapter
pub trait Ledger {
    /// Transactions of the group being evaluated
    fn group(&self) -> &[Transaction];

    /// Index of the transaction whose program is running
    fn current_index(&self) -> usize;

    fn global_field(&self, field: GlobalField) -> LedgerResult<StackValue>;

    fn balance(&self, address: &Address) -> LedgerResult<u64>;

    fn min_balance(&self, address: &Address) -> LedgerResult<u64>;

    fn opted_in(&self, address: &Address, app_id: u64) -> LedgerResult<bool>;

    fn local_get(&self, address: &Address, app_id: u64, key: &[u8])
        -> LedgerResult<Option<StackValue>>;

    fn local_put(
        &mut self,
        address: &Address,
        app_id: u64,
        key: &[u8],
        value: StackValue,
    ) -> LedgerResult<()>;

    fn local_del(&mut self, address: &Address, app_id: u64, key: &[u8]) -> LedgerResult<()>;

    fn global_get(&self, app_id: u64, key: &[u8]) -> LedgerResult<Option<StackValue>>;

    fn global_put(&mut self, app_id: u64, key: &[u8], value: StackValue) -> LedgerResult<()>;

    fn global_del(&mut self, app_id: u64, key: &[u8]) -> LedgerResult<()>;

    /// Execute an inner transaction, returning it with its effects
    /// (transaction id, created ids) filled in
    fn submit_inner(&mut self, txn: Transaction) -> LedgerResult<Transaction>;

    /// Sink for `log` output
    fn log(&mut self, _app_id: u64, _message: &[u8]) {}

    /// Start a run. Writes made after this call are kept by
    /// [`Ledger::commit`] or undone by [`Ledger::rollback`].
    fn checkpoint(&mut self);

    /// Keep every write since the last checkpoint
    fn commit(&mut self);

    /// Undo every write since the last checkpoint
    fn rollback(&mut self);

    fn transaction(&self, index: usize) -> LedgerResult<&Transaction> {
        self.group()
            .get(index)
            .ok_or(LedgerError::TransactionNotFound(index))
    }

    fn current_transaction(&self) -> LedgerResult<&Transaction> {
        self.transaction(self.current_index())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StateSchema {
    pub num_uint: u64,
    pub num_byte_slice: u64,
}

impl StateSchema {
    pub fn new(num_uint: u64, num_byte_slice: u64) -> Self {
        Self {
            num_uint,
            num_byte_slice,
        }
    }

    fn min_balance(&self) -> u64 {
        self.num_uint * SCHEMA_UINT_MIN_BALANCE + self.num_byte_slice * SCHEMA_BYTES_MIN_BALANCE
    }

    fn check(&self, app_id: u64, state: &BTreeMap<Vec<u8>, StackValue>) -> LedgerResult<()> {
        let uints = state.values().filter(|v| v.is_uint()).count() as u64;
        let bytes = state.len() as u64 - uints;
        if uints > self.num_uint {
            return Err(LedgerError::SchemaExceeded {
                app_id,
                reason: format!("{} uints, schema allows {}", uints, self.num_uint),
            });
        }
        if bytes > self.num_byte_slice {
            return Err(LedgerError::SchemaExceeded {
                app_id,
                reason: format!(
                    "{} byte slices, schema allows {}",
                    bytes, self.num_byte_slice
                ),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Account {
    pub address: Address,
    pub balance: u64,
    /// Local state per opted-in application
    pub local_state: BTreeMap<u64, BTreeMap<Vec<u8>, StackValue>>,
    pub created_apps: Vec<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Application {
    pub id: u64,
    pub creator: Address,
    pub global_state: BTreeMap<Vec<u8>, StackValue>,
    pub global_schema: StateSchema,
    pub local_schema: StateSchema,
}

fn hex_address(address: &Address) -> String {
    hex::encode(address)
}

fn check_key_value(key: &[u8], value: &StackValue) -> LedgerResult<()> {
    if key.len() > MAX_KEY_LENGTH {
        return Err(LedgerError::KeyTooLong {
            len: key.len(),
            max: MAX_KEY_LENGTH,
        });
    }
    let value_len = match value {
        StackValue::Uint(_) => 0,
        StackValue::Bytes(b) => b.len(),
    };
    if key.len() + value_len > MAX_KEY_VALUE_LENGTH {
        return Err(LedgerError::ValueTooLong {
            len: key.len() + value_len,
            max: MAX_KEY_VALUE_LENGTH,
        });
    }
    Ok(())
}

/// Mutable part of an [`InMemoryLedger`], saved at a checkpoint
#[derive(Clone, Debug)]
struct Snapshot {
    accounts: HashMap<Address, Account>,
    apps: HashMap<u64, Application>,
    next_asset_id: u64,
    next_app_id: u64,
    submitted: u64,
}

/// Ledger held entirely in memory
#[derive(Clone, Debug, Default)]
pub struct InMemoryLedger {
    accounts: HashMap<Address, Account>,
    apps: HashMap<u64, Application>,
    group: Vec<Transaction>,
    current_index: usize,
    round: u64,
    latest_timestamp: u64,
    group_id: Vec<u8>,
    next_asset_id: u64,
    next_app_id: u64,
    submitted: u64,
    checkpoint: Option<Box<Snapshot>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            group_id: vec![0; 32],
            next_asset_id: 1000,
            next_app_id: 1000,
            ..Default::default()
        }
    }

    /// Fund an account, creating it if absent
    pub fn add_account(&mut self, address: Address, balance: u64) -> &mut Self {
        let account = self.accounts.entry(address).or_insert_with(|| Account {
            address,
            ..Default::default()
        });
        account.balance = balance;
        self
    }

    /// Register an application created by `creator`. Its account is
    /// created unfunded if absent.
    pub fn create_application(
        &mut self,
        app_id: u64,
        creator: Address,
        global_schema: StateSchema,
        local_schema: StateSchema,
    ) -> &mut Self {
        self.apps.insert(
            app_id,
            Application {
                id: app_id,
                creator,
                global_state: BTreeMap::new(),
                global_schema,
                local_schema,
            },
        );
        if let Some(account) = self.accounts.get_mut(&creator) {
            account.created_apps.push(app_id);
        }
        self.accounts
            .entry(application_address(app_id))
            .or_insert_with(|| Account {
                address: application_address(app_id),
                ..Default::default()
            });
        self
    }

    /// Opt an account in to an application
    pub fn opt_in(&mut self, address: &Address, app_id: u64) -> LedgerResult<()> {
        if !self.apps.contains_key(&app_id) {
            return Err(LedgerError::ApplicationNotFound(app_id));
        }
        let account = self.account_mut(address)?;
        account.local_state.entry(app_id).or_default();
        Ok(())
    }

    /// Set the transaction group and which member is being evaluated
    pub fn set_group(&mut self, group: Vec<Transaction>, current_index: usize) -> &mut Self {
        self.group = group;
        self.current_index = current_index;
        self
    }

    pub fn set_round(&mut self, round: u64, latest_timestamp: u64) -> &mut Self {
        self.round = round;
        self.latest_timestamp = latest_timestamp;
        self
    }

    pub fn set_group_id(&mut self, group_id: Vec<u8>) -> &mut Self {
        self.group_id = group_id;
        self
    }

    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn application(&self, app_id: u64) -> Option<&Application> {
        self.apps.get(&app_id)
    }

    fn account_ref(&self, address: &Address) -> LedgerResult<&Account> {
        self.accounts
            .get(address)
            .ok_or_else(|| LedgerError::AccountNotFound(hex_address(address)))
    }

    fn account_mut(&mut self, address: &Address) -> LedgerResult<&mut Account> {
        self.accounts
            .get_mut(address)
            .ok_or_else(|| LedgerError::AccountNotFound(hex_address(address)))
    }

    fn app_ref(&self, app_id: u64) -> LedgerResult<&Application> {
        self.apps
            .get(&app_id)
            .ok_or(LedgerError::ApplicationNotFound(app_id))
    }

    fn current_app_id(&self) -> u64 {
        self.group
            .get(self.current_index)
            .map(|t| t.application_id)
            .unwrap_or(0)
    }

    fn debit(&mut self, address: &Address, amount: u64) -> LedgerResult<()> {
        let account = self.account_mut(address)?;
        if account.balance < amount {
            return Err(LedgerError::InsufficientBalance {
                address: hex_address(address),
                required: amount,
                available: account.balance,
            });
        }
        account.balance -= amount;
        Ok(())
    }

    fn credit(&mut self, address: &Address, amount: u64) -> LedgerResult<()> {
        let account = self.accounts.entry(*address).or_insert_with(|| Account {
            address: *address,
            ..Default::default()
        });
        account.balance = account.balance.checked_add(amount).ok_or_else(|| {
            LedgerError::InvalidInnerTransaction("receiver balance overflow".to_string())
        })?;
        Ok(())
    }
}

impl Ledger for InMemoryLedger {
    fn group(&self) -> &[Transaction] {
        &self.group
    }

    fn current_index(&self) -> usize {
        self.current_index
    }

    fn global_field(&self, field: GlobalField) -> LedgerResult<StackValue> {
        let value = match field {
            GlobalField::MinTxnFee => MIN_TXN_FEE.into(),
            GlobalField::MinBalance => MIN_BALANCE.into(),
            GlobalField::MaxTxnLife => MAX_TXN_LIFE.into(),
            GlobalField::ZeroAddress => StackValue::Bytes(vec![0; 32]),
            GlobalField::GroupSize => (self.group.len() as u64).into(),
            GlobalField::LogicSigVersion => MAX_VERSION.into(),
            GlobalField::Round => self.round.into(),
            GlobalField::LatestTimestamp => self.latest_timestamp.into(),
            GlobalField::CurrentApplicationID => self.current_app_id().into(),
            GlobalField::CreatorAddress => {
                let app = self.app_ref(self.current_app_id())?;
                StackValue::Bytes(app.creator.to_vec())
            }
            GlobalField::CurrentApplicationAddress => {
                StackValue::Bytes(application_address(self.current_app_id()).to_vec())
            }
            GlobalField::GroupID => StackValue::Bytes(self.group_id.clone()),
        };
        Ok(value)
    }

    fn balance(&self, address: &Address) -> LedgerResult<u64> {
        Ok(self.account_ref(address)?.balance)
    }

    fn min_balance(&self, address: &Address) -> LedgerResult<u64> {
        let account = self.account_ref(address)?;
        let mut total = MIN_BALANCE;
        for app_id in account.local_state.keys() {
            total += APP_FLAT_MIN_BALANCE;
            if let Some(app) = self.apps.get(app_id) {
                total += app.local_schema.min_balance();
            }
        }
        for app_id in &account.created_apps {
            total += APP_FLAT_MIN_BALANCE;
            if let Some(app) = self.apps.get(app_id) {
                total += app.global_schema.min_balance();
            }
        }
        Ok(total)
    }

    fn opted_in(&self, address: &Address, app_id: u64) -> LedgerResult<bool> {
        Ok(self.account_ref(address)?.local_state.contains_key(&app_id))
    }

    fn local_get(
        &self,
        address: &Address,
        app_id: u64,
        key: &[u8],
    ) -> LedgerResult<Option<StackValue>> {
        let account = self.account_ref(address)?;
        Ok(account
            .local_state
            .get(&app_id)
            .and_then(|state| state.get(key))
            .cloned())
    }

    fn local_put(
        &mut self,
        address: &Address,
        app_id: u64,
        key: &[u8],
        value: StackValue,
    ) -> LedgerResult<()> {
        check_key_value(key, &value)?;
        let schema = self.app_ref(app_id)?.local_schema;
        let account = self.account_mut(address)?;
        let state = account
            .local_state
            .get_mut(&app_id)
            .ok_or_else(|| LedgerError::NotOptedIn {
                address: hex_address(address),
                app_id,
            })?;

        let mut updated = state.clone();
        updated.insert(key.to_vec(), value);
        schema.check(app_id, &updated)?;
        *state = updated;
        Ok(())
    }

    fn local_del(&mut self, address: &Address, app_id: u64, key: &[u8]) -> LedgerResult<()> {
        let account = self.account_mut(address)?;
        let state = account
            .local_state
            .get_mut(&app_id)
            .ok_or_else(|| LedgerError::NotOptedIn {
                address: hex_address(address),
                app_id,
            })?;
        state.remove(key);
        Ok(())
    }

    fn global_get(&self, app_id: u64, key: &[u8]) -> LedgerResult<Option<StackValue>> {
        Ok(self
            .apps
            .get(&app_id)
            .and_then(|app| app.global_state.get(key))
            .cloned())
    }

    fn global_put(&mut self, app_id: u64, key: &[u8], value: StackValue) -> LedgerResult<()> {
        check_key_value(key, &value)?;
        let app = self
            .apps
            .get_mut(&app_id)
            .ok_or(LedgerError::ApplicationNotFound(app_id))?;

        let mut updated = app.global_state.clone();
        updated.insert(key.to_vec(), value);
        app.global_schema.check(app_id, &updated)?;
        app.global_state = updated;
        Ok(())
    }

    fn global_del(&mut self, app_id: u64, key: &[u8]) -> LedgerResult<()> {
        let app = self
            .apps
            .get_mut(&app_id)
            .ok_or(LedgerError::ApplicationNotFound(app_id))?;
        app.global_state.remove(key);
        Ok(())
    }

    fn submit_inner(&mut self, mut txn: Transaction) -> LedgerResult<Transaction> {
        if txn.txn_type == TxnType::KeyRegistration {
            return Err(LedgerError::InvalidInnerTransaction(
                "key registration is not allowed as an inner transaction".to_string(),
            ));
        }
        let required = match txn.txn_type {
            TxnType::Payment => txn.fee.saturating_add(txn.amount),
            _ => txn.fee,
        };
        let available = self.balance(&txn.sender)?;
        if available < required {
            return Err(LedgerError::InsufficientBalance {
                address: hex_address(&txn.sender),
                required,
                available,
            });
        }
        self.debit(&txn.sender, txn.fee)?;

        match txn.txn_type {
            TxnType::Payment => {
                self.debit(&txn.sender, txn.amount)?;
                self.credit(&txn.receiver, txn.amount)?;
                if txn.close_remainder_to != [0; 32] {
                    let rest = self.balance(&txn.sender)?;
                    self.debit(&txn.sender, rest)?;
                    self.credit(&txn.close_remainder_to, rest)?;
                }
            }
            TxnType::AssetConfig if txn.config_asset == 0 => {
                txn.created_asset_id = self.next_asset_id;
                self.next_asset_id += 1;
            }
            TxnType::ApplicationCall if txn.application_id == 0 => {
                txn.created_application_id = self.next_app_id;
                self.next_app_id += 1;
            }
            _ => {}
        }

        self.submitted += 1;
        let mut hasher = Sha512_256::new();
        hasher.update(b"TX");
        hasher.update(txn.sender);
        hasher.update(self.submitted.to_be_bytes());
        txn.tx_id = hasher.finalize().to_vec();

        Ok(txn)
    }

    fn checkpoint(&mut self) {
        self.checkpoint = Some(Box::new(Snapshot {
            accounts: self.accounts.clone(),
            apps: self.apps.clone(),
            next_asset_id: self.next_asset_id,
            next_app_id: self.next_app_id,
            submitted: self.submitted,
        }));
    }

    fn commit(&mut self) {
        self.checkpoint = None;
    }

    fn rollback(&mut self) {
        if let Some(saved) = self.checkpoint.take() {
            let saved = *saved;
            self.accounts = saved.accounts;
            self.apps = saved.apps;
            self.next_asset_id = saved.next_asset_id;
            self.next_app_id = saved.next_app_id;
            self.submitted = saved.submitted;
        }
    }
}
