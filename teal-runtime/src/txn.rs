//! # Transaction Model
//!
//! The subset of an Algorand transaction visible to TEAL programs. Field
//! reads map a [`TxnField`] onto a [`StackValue`]; inner transactions are
//! built through [`Transaction::set_field`].

use crate::error::{LedgerError, Result, RuntimeError};
use crate::guard;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512_256};
use teal_spec::{StackValue, TxnField, ADDRESS_LENGTH};

/// 32-byte account address
pub type Address = [u8; ADDRESS_LENGTH];

/// Domain separation prefix for application account addresses
pub const APP_ADDRESS_PREFIX: &[u8] = b"appID";

/// Account address controlled by an application:
/// `SHA-512/256("appID" || big-endian app id)`
pub fn application_address(app_id: u64) -> Address {
    let mut hasher = Sha512_256::new();
    hasher.update(APP_ADDRESS_PREFIX);
    hasher.update(app_id.to_be_bytes());
    hasher.finalize().into()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxnType {
    #[default]
    Payment,
    KeyRegistration,
    AssetConfig,
    AssetTransfer,
    AssetFreeze,
    ApplicationCall,
}

impl TxnType {
    const ALL: [TxnType; 6] = [
        TxnType::Payment,
        TxnType::KeyRegistration,
        TxnType::AssetConfig,
        TxnType::AssetTransfer,
        TxnType::AssetFreeze,
        TxnType::ApplicationCall,
    ];

    /// Short type string (`txn Type`)
    pub fn as_str(self) -> &'static str {
        match self {
            TxnType::Payment => "pay",
            TxnType::KeyRegistration => "keyreg",
            TxnType::AssetConfig => "acfg",
            TxnType::AssetTransfer => "axfer",
            TxnType::AssetFreeze => "afrz",
            TxnType::ApplicationCall => "appl",
        }
    }

    /// Numeric type (`txn TypeEnum`)
    pub fn as_enum(self) -> u64 {
        match self {
            TxnType::Payment => 1,
            TxnType::KeyRegistration => 2,
            TxnType::AssetConfig => 3,
            TxnType::AssetTransfer => 4,
            TxnType::AssetFreeze => 5,
            TxnType::ApplicationCall => 6,
        }
    }

    pub fn from_str_bytes(s: &[u8]) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str().as_bytes() == s)
    }

    pub fn from_enum(v: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_enum() == v)
    }
}

/// Application call completion action
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OnCompletion {
    #[default]
    NoOp,
    OptIn,
    CloseOut,
    ClearState,
    UpdateApplication,
    DeleteApplication,
}

impl OnCompletion {
    pub fn as_u64(self) -> u64 {
        match self {
            OnCompletion::NoOp => 0,
            OnCompletion::OptIn => 1,
            OnCompletion::CloseOut => 2,
            OnCompletion::ClearState => 3,
            OnCompletion::UpdateApplication => 4,
            OnCompletion::DeleteApplication => 5,
        }
    }
}

/// Asset parameters of an asset configuration transaction
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetParams {
    pub total: u64,
    pub decimals: u64,
    pub default_frozen: bool,
    pub unit_name: Vec<u8>,
    pub name: Vec<u8>,
    pub url: Vec<u8>,
    pub metadata_hash: Vec<u8>,
    pub manager: Address,
    pub reserve: Address,
    pub freeze: Address,
    pub clawback: Address,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub txn_type: TxnType,
    pub sender: Address,
    pub fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    pub note: Vec<u8>,
    pub lease: Vec<u8>,
    pub rekey_to: Address,
    pub tx_id: Vec<u8>,

    // payment
    pub receiver: Address,
    pub amount: u64,
    pub close_remainder_to: Address,

    // key registration
    pub vote_pk: Vec<u8>,
    pub selection_pk: Vec<u8>,
    pub vote_first: u64,
    pub vote_last: u64,
    pub vote_key_dilution: u64,
    pub nonparticipation: bool,

    // asset transfer
    pub xfer_asset: u64,
    pub asset_amount: u64,
    pub asset_sender: Address,
    pub asset_receiver: Address,
    pub asset_close_to: Address,

    // asset config / freeze
    pub config_asset: u64,
    pub asset_params: AssetParams,
    pub freeze_asset: u64,
    pub freeze_account: Address,
    pub freeze_frozen: bool,

    // application call
    pub application_id: u64,
    pub on_completion: OnCompletion,
    pub application_args: Vec<Vec<u8>>,
    pub accounts: Vec<Address>,
    pub assets: Vec<u64>,
    pub applications: Vec<u64>,
    pub approval_program: Vec<u8>,
    pub clear_state_program: Vec<u8>,
    pub global_num_uint: u64,
    pub global_num_byte_slice: u64,
    pub local_num_uint: u64,
    pub local_num_byte_slice: u64,
    pub extra_program_pages: u64,

    // effects, populated for executed inner transactions
    pub logs: Vec<Vec<u8>>,
    pub created_asset_id: u64,
    pub created_application_id: u64,
}

fn addr(a: &Address) -> StackValue {
    StackValue::Bytes(a.to_vec())
}

impl Transaction {
    /// Payment from `sender` to `receiver`
    pub fn payment(sender: Address, receiver: Address, amount: u64) -> Self {
        Self {
            txn_type: TxnType::Payment,
            sender,
            receiver,
            amount,
            ..Default::default()
        }
    }

    /// Application call from `sender` to `application_id`
    pub fn app_call(sender: Address, application_id: u64) -> Self {
        Self {
            txn_type: TxnType::ApplicationCall,
            sender,
            application_id,
            ..Default::default()
        }
    }

    /// Scalar field value. `group_index` is the position of this
    /// transaction in its group.
    pub fn field(&self, field: TxnField, group_index: usize) -> std::result::Result<StackValue, LedgerError> {
        let p = &self.asset_params;
        let value = match field {
            TxnField::Sender => addr(&self.sender),
            TxnField::Fee => self.fee.into(),
            TxnField::FirstValid => self.first_valid.into(),
            TxnField::FirstValidTime => return Err(LedgerError::FieldUnavailable(field)),
            TxnField::LastValid => self.last_valid.into(),
            TxnField::Note => self.note.clone().into(),
            TxnField::Lease => self.lease.clone().into(),
            TxnField::Receiver => addr(&self.receiver),
            TxnField::Amount => self.amount.into(),
            TxnField::CloseRemainderTo => addr(&self.close_remainder_to),
            TxnField::VotePK => self.vote_pk.clone().into(),
            TxnField::SelectionPK => self.selection_pk.clone().into(),
            TxnField::VoteFirst => self.vote_first.into(),
            TxnField::VoteLast => self.vote_last.into(),
            TxnField::VoteKeyDilution => self.vote_key_dilution.into(),
            TxnField::Type => self.txn_type.as_str().into(),
            TxnField::TypeEnum => self.txn_type.as_enum().into(),
            TxnField::XferAsset => self.xfer_asset.into(),
            TxnField::AssetAmount => self.asset_amount.into(),
            TxnField::AssetSender => addr(&self.asset_sender),
            TxnField::AssetReceiver => addr(&self.asset_receiver),
            TxnField::AssetCloseTo => addr(&self.asset_close_to),
            TxnField::GroupIndex => (group_index as u64).into(),
            TxnField::TxID => self.tx_id.clone().into(),
            TxnField::ApplicationID => self.application_id.into(),
            TxnField::OnCompletion => self.on_completion.as_u64().into(),
            TxnField::NumAppArgs => (self.application_args.len() as u64).into(),
            TxnField::NumAccounts => (self.accounts.len() as u64).into(),
            TxnField::ApprovalProgram => self.approval_program.clone().into(),
            TxnField::ClearStateProgram => self.clear_state_program.clone().into(),
            TxnField::RekeyTo => addr(&self.rekey_to),
            TxnField::ConfigAsset => self.config_asset.into(),
            TxnField::ConfigAssetTotal => p.total.into(),
            TxnField::ConfigAssetDecimals => p.decimals.into(),
            TxnField::ConfigAssetDefaultFrozen => StackValue::from_bool(p.default_frozen),
            TxnField::ConfigAssetUnitName => p.unit_name.clone().into(),
            TxnField::ConfigAssetName => p.name.clone().into(),
            TxnField::ConfigAssetURL => p.url.clone().into(),
            TxnField::ConfigAssetMetadataHash => p.metadata_hash.clone().into(),
            TxnField::ConfigAssetManager => addr(&p.manager),
            TxnField::ConfigAssetReserve => addr(&p.reserve),
            TxnField::ConfigAssetFreeze => addr(&p.freeze),
            TxnField::ConfigAssetClawback => addr(&p.clawback),
            TxnField::FreezeAsset => self.freeze_asset.into(),
            TxnField::FreezeAssetAccount => addr(&self.freeze_account),
            TxnField::FreezeAssetFrozen => StackValue::from_bool(self.freeze_frozen),
            TxnField::NumAssets => (self.assets.len() as u64).into(),
            TxnField::NumApplications => (self.applications.len() as u64).into(),
            TxnField::GlobalNumUint => self.global_num_uint.into(),
            TxnField::GlobalNumByteSlice => self.global_num_byte_slice.into(),
            TxnField::LocalNumUint => self.local_num_uint.into(),
            TxnField::LocalNumByteSlice => self.local_num_byte_slice.into(),
            TxnField::ExtraProgramPages => self.extra_program_pages.into(),
            TxnField::Nonparticipation => StackValue::from_bool(self.nonparticipation),
            TxnField::NumLogs => (self.logs.len() as u64).into(),
            TxnField::CreatedAssetID => self.created_asset_id.into(),
            TxnField::CreatedApplicationID => self.created_application_id.into(),
            TxnField::ApplicationArgs
            | TxnField::Accounts
            | TxnField::Assets
            | TxnField::Applications
            | TxnField::Logs => return Err(LedgerError::FieldUnavailable(field)),
        };
        Ok(value)
    }

    /// Number of addressable elements of an array field. `Accounts` counts
    /// the sender at index 0 and `Applications` the current app at index 0.
    pub fn array_len(&self, field: TxnField) -> usize {
        match field {
            TxnField::ApplicationArgs => self.application_args.len(),
            TxnField::Accounts => self.accounts.len() + 1,
            TxnField::Assets => self.assets.len(),
            TxnField::Applications => self.applications.len() + 1,
            TxnField::Logs => self.logs.len(),
            _ => 0,
        }
    }

    /// Element `index` of an array field
    pub fn array_field(&self, field: TxnField, index: u64, line: usize) -> Result<StackValue> {
        let value = match field {
            TxnField::ApplicationArgs => {
                let i = guard::check_index_bound(index, &self.application_args, line)?;
                self.application_args[i].clone().into()
            }
            TxnField::Accounts => {
                if index == 0 {
                    addr(&self.sender)
                } else {
                    let i = guard::check_index_bound(index - 1, &self.accounts, line)?;
                    addr(&self.accounts[i])
                }
            }
            TxnField::Assets => {
                let i = guard::check_index_bound(index, &self.assets, line)?;
                self.assets[i].into()
            }
            TxnField::Applications => {
                if index == 0 {
                    self.application_id.into()
                } else {
                    let i = guard::check_index_bound(index - 1, &self.applications, line)?;
                    self.applications[i].into()
                }
            }
            TxnField::Logs => {
                let i = guard::check_index_bound(index, &self.logs, line)?;
                self.logs[i].clone().into()
            }
            other => {
                return Err(RuntimeError::ledger(
                    line,
                    LedgerError::FieldUnavailable(other),
                ))
            }
        };
        Ok(value)
    }

    /// Set a field of a pending inner transaction from a stack value
    pub fn set_field(&mut self, field: TxnField, value: &StackValue, line: usize) -> Result<()> {
        let as_addr = |v: &StackValue| -> Result<Address> {
            let bytes = guard::assert_bytes(v, line, None)?;
            Address::try_from(bytes).map_err(|_| RuntimeError::InvalidType {
                expected: "address".to_string(),
                actual: format!("byte[{}]", bytes.len()),
                line,
            })
        };
        let as_uint = |v: &StackValue| guard::assert_uint64(v, line);
        let as_bytes = |v: &StackValue| guard::assert_bytes(v, line, None).map(|b| b.to_vec());
        let as_bool = |v: &StackValue| -> Result<bool> {
            match guard::assert_uint64(v, line)? {
                0 => Ok(false),
                1 => Ok(true),
                other => Err(RuntimeError::InvalidType {
                    expected: "0 or 1".to_string(),
                    actual: other.to_string(),
                    line,
                }),
            }
        };

        match field {
            TxnField::Sender => self.sender = as_addr(value)?,
            TxnField::Fee => self.fee = as_uint(value)?,
            TxnField::Receiver => self.receiver = as_addr(value)?,
            TxnField::Amount => self.amount = as_uint(value)?,
            TxnField::CloseRemainderTo => self.close_remainder_to = as_addr(value)?,
            TxnField::Type => {
                let bytes = guard::assert_bytes(value, line, None)?;
                self.txn_type = TxnType::from_str_bytes(bytes).ok_or_else(|| {
                    RuntimeError::InvalidType {
                        expected: "transaction type".to_string(),
                        actual: String::from_utf8_lossy(bytes).into_owned(),
                        line,
                    }
                })?;
            }
            TxnField::TypeEnum => {
                let v = as_uint(value)?;
                self.txn_type = TxnType::from_enum(v).ok_or_else(|| RuntimeError::InvalidType {
                    expected: "transaction type enum 1..=6".to_string(),
                    actual: v.to_string(),
                    line,
                })?;
            }
            TxnField::XferAsset => self.xfer_asset = as_uint(value)?,
            TxnField::AssetAmount => self.asset_amount = as_uint(value)?,
            TxnField::AssetSender => self.asset_sender = as_addr(value)?,
            TxnField::AssetReceiver => self.asset_receiver = as_addr(value)?,
            TxnField::AssetCloseTo => self.asset_close_to = as_addr(value)?,
            TxnField::ConfigAsset => self.config_asset = as_uint(value)?,
            TxnField::ConfigAssetTotal => self.asset_params.total = as_uint(value)?,
            TxnField::ConfigAssetDecimals => self.asset_params.decimals = as_uint(value)?,
            TxnField::ConfigAssetDefaultFrozen => {
                self.asset_params.default_frozen = as_bool(value)?
            }
            TxnField::ConfigAssetUnitName => self.asset_params.unit_name = as_bytes(value)?,
            TxnField::ConfigAssetName => self.asset_params.name = as_bytes(value)?,
            TxnField::ConfigAssetURL => self.asset_params.url = as_bytes(value)?,
            TxnField::ConfigAssetMetadataHash => {
                self.asset_params.metadata_hash = as_bytes(value)?
            }
            TxnField::ConfigAssetManager => self.asset_params.manager = as_addr(value)?,
            TxnField::ConfigAssetReserve => self.asset_params.reserve = as_addr(value)?,
            TxnField::ConfigAssetFreeze => self.asset_params.freeze = as_addr(value)?,
            TxnField::ConfigAssetClawback => self.asset_params.clawback = as_addr(value)?,
            TxnField::FreezeAsset => self.freeze_asset = as_uint(value)?,
            TxnField::FreezeAssetAccount => self.freeze_account = as_addr(value)?,
            TxnField::FreezeAssetFrozen => self.freeze_frozen = as_bool(value)?,
            other => {
                return Err(RuntimeError::InvalidOpArg {
                    arg: other.name().to_string(),
                    version: teal_spec::MAX_VERSION,
                    line,
                })
            }
        }
        Ok(())
    }
}
