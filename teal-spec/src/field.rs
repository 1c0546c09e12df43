//! # Transaction and Global Field Schemas
//!
//! TEAL programs name transaction and global fields symbolically
//! (`txn Sender`, `global GroupSize`). Which names are valid depends on the
//! program's version. This module holds the field enums and the static,
//! version-indexed tables used to validate field operands before lookup.
//!
//! Tables are built once on first use and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::OnceLock;

use crate::MAX_VERSION;

/// Transaction field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxnField {
    Sender,
    Fee,
    FirstValid,
    FirstValidTime,
    LastValid,
    Note,
    Lease,
    Receiver,
    Amount,
    CloseRemainderTo,
    VotePK,
    SelectionPK,
    VoteFirst,
    VoteLast,
    VoteKeyDilution,
    Type,
    TypeEnum,
    XferAsset,
    AssetAmount,
    AssetSender,
    AssetReceiver,
    AssetCloseTo,
    GroupIndex,
    TxID,
    // v2
    ApplicationID,
    OnCompletion,
    ApplicationArgs,
    NumAppArgs,
    Accounts,
    NumAccounts,
    ApprovalProgram,
    ClearStateProgram,
    RekeyTo,
    ConfigAsset,
    ConfigAssetTotal,
    ConfigAssetDecimals,
    ConfigAssetDefaultFrozen,
    ConfigAssetUnitName,
    ConfigAssetName,
    ConfigAssetURL,
    ConfigAssetMetadataHash,
    ConfigAssetManager,
    ConfigAssetReserve,
    ConfigAssetFreeze,
    ConfigAssetClawback,
    FreezeAsset,
    FreezeAssetAccount,
    FreezeAssetFrozen,
    // v3
    Assets,
    NumAssets,
    Applications,
    NumApplications,
    GlobalNumUint,
    GlobalNumByteSlice,
    LocalNumUint,
    LocalNumByteSlice,
    // v4
    ExtraProgramPages,
    // v5
    Nonparticipation,
    Logs,
    NumLogs,
    CreatedAssetID,
    CreatedApplicationID,
}

/// Where a transaction field becomes visible
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Scope {
    /// Readable from any transaction (`txn`, `gtxn`, `itxn`)
    Txn,
    /// Readable only from submitted inner transactions (`itxn`)
    InnerOnly,
}

impl TxnField {
    /// Every transaction field with the version introducing it, its scope
    /// and whether it is array-valued
    const TABLE: &'static [(TxnField, u64, Scope, bool)] = &[
        (TxnField::Sender, 1, Scope::Txn, false),
        (TxnField::Fee, 1, Scope::Txn, false),
        (TxnField::FirstValid, 1, Scope::Txn, false),
        (TxnField::FirstValidTime, 1, Scope::Txn, false),
        (TxnField::LastValid, 1, Scope::Txn, false),
        (TxnField::Note, 1, Scope::Txn, false),
        (TxnField::Lease, 1, Scope::Txn, false),
        (TxnField::Receiver, 1, Scope::Txn, false),
        (TxnField::Amount, 1, Scope::Txn, false),
        (TxnField::CloseRemainderTo, 1, Scope::Txn, false),
        (TxnField::VotePK, 1, Scope::Txn, false),
        (TxnField::SelectionPK, 1, Scope::Txn, false),
        (TxnField::VoteFirst, 1, Scope::Txn, false),
        (TxnField::VoteLast, 1, Scope::Txn, false),
        (TxnField::VoteKeyDilution, 1, Scope::Txn, false),
        (TxnField::Type, 1, Scope::Txn, false),
        (TxnField::TypeEnum, 1, Scope::Txn, false),
        (TxnField::XferAsset, 1, Scope::Txn, false),
        (TxnField::AssetAmount, 1, Scope::Txn, false),
        (TxnField::AssetSender, 1, Scope::Txn, false),
        (TxnField::AssetReceiver, 1, Scope::Txn, false),
        (TxnField::AssetCloseTo, 1, Scope::Txn, false),
        (TxnField::GroupIndex, 1, Scope::Txn, false),
        (TxnField::TxID, 1, Scope::Txn, false),
        (TxnField::ApplicationID, 2, Scope::Txn, false),
        (TxnField::OnCompletion, 2, Scope::Txn, false),
        (TxnField::ApplicationArgs, 2, Scope::Txn, true),
        (TxnField::NumAppArgs, 2, Scope::Txn, false),
        (TxnField::Accounts, 2, Scope::Txn, true),
        (TxnField::NumAccounts, 2, Scope::Txn, false),
        (TxnField::ApprovalProgram, 2, Scope::Txn, false),
        (TxnField::ClearStateProgram, 2, Scope::Txn, false),
        (TxnField::RekeyTo, 2, Scope::Txn, false),
        (TxnField::ConfigAsset, 2, Scope::Txn, false),
        (TxnField::ConfigAssetTotal, 2, Scope::Txn, false),
        (TxnField::ConfigAssetDecimals, 2, Scope::Txn, false),
        (TxnField::ConfigAssetDefaultFrozen, 2, Scope::Txn, false),
        (TxnField::ConfigAssetUnitName, 2, Scope::Txn, false),
        (TxnField::ConfigAssetName, 2, Scope::Txn, false),
        (TxnField::ConfigAssetURL, 2, Scope::Txn, false),
        (TxnField::ConfigAssetMetadataHash, 2, Scope::Txn, false),
        (TxnField::ConfigAssetManager, 2, Scope::Txn, false),
        (TxnField::ConfigAssetReserve, 2, Scope::Txn, false),
        (TxnField::ConfigAssetFreeze, 2, Scope::Txn, false),
        (TxnField::ConfigAssetClawback, 2, Scope::Txn, false),
        (TxnField::FreezeAsset, 2, Scope::Txn, false),
        (TxnField::FreezeAssetAccount, 2, Scope::Txn, false),
        (TxnField::FreezeAssetFrozen, 2, Scope::Txn, false),
        (TxnField::Assets, 3, Scope::Txn, true),
        (TxnField::NumAssets, 3, Scope::Txn, false),
        (TxnField::Applications, 3, Scope::Txn, true),
        (TxnField::NumApplications, 3, Scope::Txn, false),
        (TxnField::GlobalNumUint, 3, Scope::Txn, false),
        (TxnField::GlobalNumByteSlice, 3, Scope::Txn, false),
        (TxnField::LocalNumUint, 3, Scope::Txn, false),
        (TxnField::LocalNumByteSlice, 3, Scope::Txn, false),
        (TxnField::ExtraProgramPages, 4, Scope::Txn, false),
        (TxnField::Nonparticipation, 5, Scope::Txn, false),
        (TxnField::Logs, 5, Scope::InnerOnly, true),
        (TxnField::NumLogs, 5, Scope::InnerOnly, false),
        (TxnField::CreatedAssetID, 5, Scope::InnerOnly, false),
        (TxnField::CreatedApplicationID, 5, Scope::InnerOnly, false),
    ];

    /// Field name as written in TEAL source
    pub fn name(self) -> &'static str {
        match self {
            TxnField::Sender => "Sender",
            TxnField::Fee => "Fee",
            TxnField::FirstValid => "FirstValid",
            TxnField::FirstValidTime => "FirstValidTime",
            TxnField::LastValid => "LastValid",
            TxnField::Note => "Note",
            TxnField::Lease => "Lease",
            TxnField::Receiver => "Receiver",
            TxnField::Amount => "Amount",
            TxnField::CloseRemainderTo => "CloseRemainderTo",
            TxnField::VotePK => "VotePK",
            TxnField::SelectionPK => "SelectionPK",
            TxnField::VoteFirst => "VoteFirst",
            TxnField::VoteLast => "VoteLast",
            TxnField::VoteKeyDilution => "VoteKeyDilution",
            TxnField::Type => "Type",
            TxnField::TypeEnum => "TypeEnum",
            TxnField::XferAsset => "XferAsset",
            TxnField::AssetAmount => "AssetAmount",
            TxnField::AssetSender => "AssetSender",
            TxnField::AssetReceiver => "AssetReceiver",
            TxnField::AssetCloseTo => "AssetCloseTo",
            TxnField::GroupIndex => "GroupIndex",
            TxnField::TxID => "TxID",
            TxnField::ApplicationID => "ApplicationID",
            TxnField::OnCompletion => "OnCompletion",
            TxnField::ApplicationArgs => "ApplicationArgs",
            TxnField::NumAppArgs => "NumAppArgs",
            TxnField::Accounts => "Accounts",
            TxnField::NumAccounts => "NumAccounts",
            TxnField::ApprovalProgram => "ApprovalProgram",
            TxnField::ClearStateProgram => "ClearStateProgram",
            TxnField::RekeyTo => "RekeyTo",
            TxnField::ConfigAsset => "ConfigAsset",
            TxnField::ConfigAssetTotal => "ConfigAssetTotal",
            TxnField::ConfigAssetDecimals => "ConfigAssetDecimals",
            TxnField::ConfigAssetDefaultFrozen => "ConfigAssetDefaultFrozen",
            TxnField::ConfigAssetUnitName => "ConfigAssetUnitName",
            TxnField::ConfigAssetName => "ConfigAssetName",
            TxnField::ConfigAssetURL => "ConfigAssetURL",
            TxnField::ConfigAssetMetadataHash => "ConfigAssetMetadataHash",
            TxnField::ConfigAssetManager => "ConfigAssetManager",
            TxnField::ConfigAssetReserve => "ConfigAssetReserve",
            TxnField::ConfigAssetFreeze => "ConfigAssetFreeze",
            TxnField::ConfigAssetClawback => "ConfigAssetClawback",
            TxnField::FreezeAsset => "FreezeAsset",
            TxnField::FreezeAssetAccount => "FreezeAssetAccount",
            TxnField::FreezeAssetFrozen => "FreezeAssetFrozen",
            TxnField::Assets => "Assets",
            TxnField::NumAssets => "NumAssets",
            TxnField::Applications => "Applications",
            TxnField::NumApplications => "NumApplications",
            TxnField::GlobalNumUint => "GlobalNumUint",
            TxnField::GlobalNumByteSlice => "GlobalNumByteSlice",
            TxnField::LocalNumUint => "LocalNumUint",
            TxnField::LocalNumByteSlice => "LocalNumByteSlice",
            TxnField::ExtraProgramPages => "ExtraProgramPages",
            TxnField::Nonparticipation => "Nonparticipation",
            TxnField::Logs => "Logs",
            TxnField::NumLogs => "NumLogs",
            TxnField::CreatedAssetID => "CreatedAssetID",
            TxnField::CreatedApplicationID => "CreatedApplicationID",
        }
    }

    /// Encoded transaction key the field is read from. Derived fields
    /// (counts, group index) have no key of their own.
    pub fn encoding_key(self) -> Option<&'static str> {
        let key = match self {
            TxnField::Sender => "snd",
            TxnField::Fee => "fee",
            TxnField::FirstValid => "fv",
            TxnField::FirstValidTime => "fvt",
            TxnField::LastValid => "lv",
            TxnField::Note => "note",
            TxnField::Lease => "lx",
            TxnField::Receiver => "rcv",
            TxnField::Amount => "amt",
            TxnField::CloseRemainderTo => "close",
            TxnField::VotePK => "votekey",
            TxnField::SelectionPK => "selkey",
            TxnField::VoteFirst => "votefst",
            TxnField::VoteLast => "votelst",
            TxnField::VoteKeyDilution => "votekd",
            TxnField::Type | TxnField::TypeEnum => "type",
            TxnField::XferAsset => "xaid",
            TxnField::AssetAmount => "aamt",
            TxnField::AssetSender => "asnd",
            TxnField::AssetReceiver => "arcv",
            TxnField::AssetCloseTo => "aclose",
            TxnField::TxID => "txID",
            TxnField::ApplicationID => "apid",
            TxnField::OnCompletion => "apan",
            TxnField::ApplicationArgs => "apaa",
            TxnField::Accounts => "apat",
            TxnField::ApprovalProgram => "apap",
            TxnField::ClearStateProgram => "apsu",
            TxnField::RekeyTo => "rekey",
            TxnField::ConfigAsset => "caid",
            TxnField::ConfigAssetTotal => "t",
            TxnField::ConfigAssetDecimals => "dc",
            TxnField::ConfigAssetDefaultFrozen => "df",
            TxnField::ConfigAssetUnitName => "un",
            TxnField::ConfigAssetName => "an",
            TxnField::ConfigAssetURL => "au",
            TxnField::ConfigAssetMetadataHash => "am",
            TxnField::ConfigAssetManager => "m",
            TxnField::ConfigAssetReserve => "r",
            TxnField::ConfigAssetFreeze => "f",
            TxnField::ConfigAssetClawback => "c",
            TxnField::FreezeAsset => "faid",
            TxnField::FreezeAssetAccount => "fadd",
            TxnField::FreezeAssetFrozen => "afrz",
            TxnField::Assets => "apas",
            TxnField::Applications => "apfa",
            TxnField::GlobalNumUint | TxnField::LocalNumUint => "nui",
            TxnField::GlobalNumByteSlice | TxnField::LocalNumByteSlice => "nbs",
            TxnField::ExtraProgramPages => "apep",
            TxnField::Nonparticipation => "nonpart",
            TxnField::GroupIndex
            | TxnField::NumAppArgs
            | TxnField::NumAccounts
            | TxnField::NumAssets
            | TxnField::NumApplications
            | TxnField::Logs
            | TxnField::NumLogs
            | TxnField::CreatedAssetID
            | TxnField::CreatedApplicationID => return None,
        };
        Some(key)
    }

    /// Whether the field is array-valued
    pub fn is_array(self) -> bool {
        matches!(
            self,
            TxnField::ApplicationArgs
                | TxnField::Accounts
                | TxnField::Assets
                | TxnField::Applications
                | TxnField::Logs
        )
    }

    /// Whether `itxn_field` may set this field on a pending inner transaction
    pub fn is_inner_settable(self) -> bool {
        matches!(
            self,
            TxnField::Sender
                | TxnField::Fee
                | TxnField::Receiver
                | TxnField::Amount
                | TxnField::CloseRemainderTo
                | TxnField::Type
                | TxnField::TypeEnum
                | TxnField::XferAsset
                | TxnField::AssetAmount
                | TxnField::AssetSender
                | TxnField::AssetReceiver
                | TxnField::AssetCloseTo
                | TxnField::ConfigAsset
                | TxnField::ConfigAssetTotal
                | TxnField::ConfigAssetDecimals
                | TxnField::ConfigAssetDefaultFrozen
                | TxnField::ConfigAssetUnitName
                | TxnField::ConfigAssetName
                | TxnField::ConfigAssetURL
                | TxnField::ConfigAssetMetadataHash
                | TxnField::ConfigAssetManager
                | TxnField::ConfigAssetReserve
                | TxnField::ConfigAssetFreeze
                | TxnField::ConfigAssetClawback
                | TxnField::FreezeAsset
                | TxnField::FreezeAssetAccount
                | TxnField::FreezeAssetFrozen
        )
    }
}

impl fmt::Display for TxnField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Global field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GlobalField {
    MinTxnFee,
    MinBalance,
    MaxTxnLife,
    ZeroAddress,
    GroupSize,
    LogicSigVersion,
    Round,
    LatestTimestamp,
    CurrentApplicationID,
    CreatorAddress,
    CurrentApplicationAddress,
    GroupID,
}

impl GlobalField {
    const TABLE: &'static [(GlobalField, u64)] = &[
        (GlobalField::MinTxnFee, 1),
        (GlobalField::MinBalance, 1),
        (GlobalField::MaxTxnLife, 1),
        (GlobalField::ZeroAddress, 1),
        (GlobalField::GroupSize, 1),
        (GlobalField::LogicSigVersion, 2),
        (GlobalField::Round, 2),
        (GlobalField::LatestTimestamp, 2),
        (GlobalField::CurrentApplicationID, 2),
        (GlobalField::CreatorAddress, 3),
        (GlobalField::CurrentApplicationAddress, 5),
        (GlobalField::GroupID, 5),
    ];

    pub fn name(self) -> &'static str {
        match self {
            GlobalField::MinTxnFee => "MinTxnFee",
            GlobalField::MinBalance => "MinBalance",
            GlobalField::MaxTxnLife => "MaxTxnLife",
            GlobalField::ZeroAddress => "ZeroAddress",
            GlobalField::GroupSize => "GroupSize",
            GlobalField::LogicSigVersion => "LogicSigVersion",
            GlobalField::Round => "Round",
            GlobalField::LatestTimestamp => "LatestTimestamp",
            GlobalField::CurrentApplicationID => "CurrentApplicationID",
            GlobalField::CreatorAddress => "CreatorAddress",
            GlobalField::CurrentApplicationAddress => "CurrentApplicationAddress",
            GlobalField::GroupID => "GroupID",
        }
    }
}

impl fmt::Display for GlobalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Field tables for a single TEAL version
#[derive(Debug, Default)]
pub struct FieldSchema {
    txn: HashMap<&'static str, TxnField>,
    txn_array: HashSet<&'static str>,
    itxn: HashMap<&'static str, TxnField>,
    itxn_array: HashSet<&'static str>,
    global: HashMap<&'static str, GlobalField>,
}

impl FieldSchema {
    fn build(version: u64) -> Self {
        let mut schema = FieldSchema::default();

        for &(field, since, scope, is_array) in TxnField::TABLE {
            if since > version {
                continue;
            }
            match scope {
                Scope::Txn => {
                    schema.txn.insert(field.name(), field);
                    if is_array {
                        schema.txn_array.insert(field.name());
                    }
                }
                Scope::InnerOnly => {
                    schema.itxn.insert(field.name(), field);
                    if is_array {
                        schema.itxn_array.insert(field.name());
                    }
                }
            }
        }

        for &(field, since) in GlobalField::TABLE {
            if since <= version {
                schema.global.insert(field.name(), field);
            }
        }

        schema
    }

    /// Scalar-accessible transaction field (`txn`, `gtxn`, `gtxns`)
    pub fn txn(&self, name: &str) -> Option<TxnField> {
        self.txn.get(name).copied()
    }

    /// Array transaction field (`txna`, `gtxna`, `gtxnsa`)
    pub fn txn_array(&self, name: &str) -> Option<TxnField> {
        if self.txn_array.contains(name) {
            self.txn(name)
        } else {
            None
        }
    }

    /// Inner transaction field: base transaction fields first, then the
    /// inner-only layer
    pub fn itxn(&self, name: &str) -> Option<TxnField> {
        self.txn(name).or_else(|| self.itxn.get(name).copied())
    }

    /// Inner transaction array field, layered the same way as [`Self::itxn`]
    pub fn itxn_array(&self, name: &str) -> Option<TxnField> {
        self.txn_array(name).or_else(|| {
            if self.itxn_array.contains(name) {
                self.itxn.get(name).copied()
            } else {
                None
            }
        })
    }

    pub fn global(&self, name: &str) -> Option<GlobalField> {
        self.global.get(name).copied()
    }

    /// Number of scalar transaction fields visible at this version
    pub fn txn_field_count(&self) -> usize {
        self.txn.len()
    }
}

static SCHEMAS: OnceLock<Vec<FieldSchema>> = OnceLock::new();

/// Field schema for a TEAL version, or `None` for an unsupported version.
/// Index 0 is never valid.
pub fn schema(version: u64) -> Option<&'static FieldSchema> {
    if version == 0 || version > MAX_VERSION {
        return None;
    }
    let schemas = SCHEMAS.get_or_init(|| (0..=MAX_VERSION).map(FieldSchema::build).collect());
    schemas.get(version as usize)
}
