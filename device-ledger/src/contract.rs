//! Device registry contract
//!
//! Deterministic state machine over the world state. Each invocation runs
//! inside one [`TxContext`]; the existence check and the write of register,
//! update and delete therefore happen in the same transaction.
//!
//! ```text
//!   Absent ──register/init──▶ Present ──update──▶ Present
//!                                │
//!                                └──delete──▶ Absent
//! ```
//!
//! Authenticate observes a present record and rejects it when its status is
//! `Inactive`.

use crate::{
    canonical,
    context::TxContext,
    error::{Error, Result},
    types::{DeviceRecord, PLACEHOLDER_KEY},
};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Contract functions, addressable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    /// Write the initialization placeholder
    InitLedger,
    /// Create a device record
    RegisterDevice,
    /// Overwrite an existing device record
    UpdateDevice,
    /// Read a device record unless blacklisted
    AuthenticateDevice,
    /// Remove a device record
    DeleteDevice,
    /// Enumerate all records
    ListAllDevices,
    /// Existence check
    DeviceExists,
}

impl Function {
    /// Canonical invocation name
    pub fn name(&self) -> &'static str {
        match self {
            Function::InitLedger => "InitLedger",
            Function::RegisterDevice => "RegisterDevice",
            Function::UpdateDevice => "UpdateDevice",
            Function::AuthenticateDevice => "AuthenticateDevice",
            Function::DeleteDevice => "DeleteDevice",
            Function::ListAllDevices => "ListAllDevices",
            Function::DeviceExists => "DeviceExists",
        }
    }

    /// Number of positional string arguments
    pub fn arity(&self) -> usize {
        match self {
            Function::InitLedger | Function::ListAllDevices => 0,
            Function::AuthenticateDevice | Function::DeleteDevice | Function::DeviceExists => 1,
            Function::RegisterDevice | Function::UpdateDevice => 2,
        }
    }

    /// True for functions that never write
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Function::AuthenticateDevice | Function::ListAllDevices | Function::DeviceExists
        )
    }
}

impl FromStr for Function {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "InitLedger" | "InitializeLedger" => Ok(Function::InitLedger),
            "RegisterDevice" | "register_device" => Ok(Function::RegisterDevice),
            "UpdateDevice" | "Update_device" => Ok(Function::UpdateDevice),
            "AuthenticateDevice" | "Device_Auth" => Ok(Function::AuthenticateDevice),
            "DeleteDevice" | "Delete_device" => Ok(Function::DeleteDevice),
            "ListAllDevices" | "Get_All_devices" => Ok(Function::ListAllDevices),
            "DeviceExists" | "device_exists" => Ok(Function::DeviceExists),
            other => Err(Error::UnknownFunction(other.to_string())),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The device registry contract
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceContract;

impl DeviceContract {
    /// Create contract
    pub fn new() -> Self {
        Self
    }

    /// Dispatch a named invocation with positional arguments
    pub fn invoke(&self, ctx: &mut TxContext<'_>, function: Function, args: &[String]) -> Result<Vec<u8>> {
        if args.len() != function.arity() {
            return Err(Error::InvalidArgument(format!(
                "Incorrect number of params. Expected {}, received {}",
                function.arity(),
                args.len()
            )));
        }

        match function {
            Function::InitLedger => self.init_ledger(ctx).map(|_| Vec::new()),
            Function::RegisterDevice => self
                .register_device(ctx, &args[0], &args[1])
                .map(String::into_bytes),
            Function::UpdateDevice => self
                .update_device(ctx, &args[0], &args[1])
                .map(|_| Vec::new()),
            Function::AuthenticateDevice => self.authenticate_device(ctx, &args[0]),
            Function::DeleteDevice => self.delete_device(ctx, &args[0]).map(|_| Vec::new()),
            Function::ListAllDevices => {
                let records = self.list_all_devices(ctx)?;
                canonical::to_canonical_vec(&records)
            }
            Function::DeviceExists => {
                let exists = self.device_exists(ctx, &args[0])?;
                Ok(exists.to_string().into_bytes())
            }
        }
    }

    /// Write the initialization placeholder
    ///
    /// Re-running rewrites the same key with the same bytes.
    pub fn init_ledger(&self, ctx: &mut TxContext<'_>) -> Result<()> {
        let placeholder = DeviceRecord::placeholder();
        ctx.put_state(PLACEHOLDER_KEY, placeholder.to_canonical_bytes()?)?;
        tracing::info!("Ledger initialized with placeholder record");
        Ok(())
    }

    /// Create a device; returns the encoded record
    pub fn register_device(&self, ctx: &mut TxContext<'_>, id: &str, status: &str) -> Result<String> {
        validate_id(id)?;
        if self.device_exists(ctx, id)? {
            return Err(Error::AlreadyExists(id.to_string()));
        }

        let encoded = canonical::to_canonical_string(&DeviceRecord::new(id, status))?;
        ctx.put_state(id, encoded.clone().into_bytes())?;

        tracing::info!(device_id = %id, status = %status, "Device registered");
        Ok(encoded)
    }

    /// Replace a device record entirely
    pub fn update_device(&self, ctx: &mut TxContext<'_>, id: &str, status: &str) -> Result<()> {
        validate_id(id)?;
        if !self.device_exists(ctx, id)? {
            return Err(Error::NotFound(id.to_string()));
        }

        let record = DeviceRecord::new(id, status);
        ctx.put_state(id, record.to_canonical_bytes()?)?;

        tracing::info!(device_id = %id, status = %status, "Device updated");
        Ok(())
    }

    /// Return the stored bytes of an active device
    pub fn authenticate_device(&self, ctx: &TxContext<'_>, id: &str) -> Result<Vec<u8>> {
        validate_id(id)?;
        let stored = ctx
            .get_state(id)?
            .filter(|bytes| !bytes.is_empty())
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        let record = DeviceRecord::from_slice(&stored)?;
        if record.is_blacklisted() {
            return Err(Error::Blacklisted(id.to_string()));
        }

        tracing::debug!(device_id = %id, "Device authenticated");
        Ok(stored)
    }

    /// Remove a device record
    pub fn delete_device(&self, ctx: &mut TxContext<'_>, id: &str) -> Result<()> {
        validate_id(id)?;
        if !self.device_exists(ctx, id)? {
            return Err(Error::NotFound(id.to_string()));
        }

        ctx.delete_state(id)?;

        tracing::info!(device_id = %id, "Device deleted");
        Ok(())
    }

    /// Every stored value in key order
    ///
    /// Values that do not decode are returned as their raw text.
    pub fn list_all_devices(&self, ctx: &TxContext<'_>) -> Result<Vec<Value>> {
        let entries = ctx.get_state_by_range("", "")?;

        let records = entries
            .into_iter()
            .map(|(key, bytes)| match serde_json::from_slice::<Value>(&bytes) {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Undecodable world-state value, returning raw text");
                    Value::String(String::from_utf8_lossy(&bytes).into_owned())
                }
            })
            .collect();

        Ok(records)
    }

    /// True iff a non-empty value is stored at `id`
    pub fn device_exists(&self, ctx: &TxContext<'_>, id: &str) -> Result<bool> {
        Ok(ctx
            .get_state(id)?
            .map(|bytes| !bytes.is_empty())
            .unwrap_or(false))
    }
}

fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::InvalidArgument("device ID must not be empty".to_string()));
    }
    Ok(())
}
