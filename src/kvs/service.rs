//! Bus adapter for the KVS.

use std::sync::Arc;

use log::info;

use super::{KeyValueStore, KvsError};
use crate::app::ports::StoragePort;
use crate::bus::{Service, ServiceArg, ServiceError, ServiceId};

/// Commands accepted by [`KvsService`], by wire value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KvsCommand {
    /// Fill the argument entry with the cached value.
    Get = 0,
    /// Store the argument entry.
    Put = 1,
    /// `Ok` if the key is on durable storage, `NotFound` otherwise.
    Verify = 2,
    /// Factory reset of the whole namespace.
    Erase = 3,
}

impl KvsCommand {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Get),
            1 => Some(Self::Put),
            2 => Some(Self::Verify),
            3 => Some(Self::Erase),
            _ => None,
        }
    }
}

/// Exposes a shared [`KeyValueStore`] on the bus as [`ServiceId::Kvs`].
pub struct KvsService<S: StoragePort> {
    store: Arc<KeyValueStore<S>>,
}

impl<S: StoragePort> KvsService<S> {
    pub fn new(store: Arc<KeyValueStore<S>>) -> Self {
        Self { store }
    }
}

impl<S: StoragePort + Send + 'static> Service for KvsService<S> {
    fn id(&self) -> ServiceId {
        ServiceId::Kvs
    }

    fn init(&mut self) -> Result<(), ServiceError> {
        info!("KVS: service online");
        Ok(())
    }

    fn deinit(&mut self) -> Result<(), ServiceError> {
        info!("KVS: service offline");
        Ok(())
    }

    fn handle(&self, command: u8, arg: &mut ServiceArg) -> Result<(), ServiceError> {
        let command = KvsCommand::from_raw(command).ok_or(ServiceError::UnsupportedCommand(command))?;
        match (command, arg) {
            (KvsCommand::Get, ServiceArg::Kvs(entry)) => {
                *entry = self.store.get(entry.key);
                Ok(())
            }
            (KvsCommand::Put, ServiceArg::Kvs(entry)) => {
                self.store.put(entry.key, entry.as_bytes())?;
                Ok(())
            }
            (KvsCommand::Verify, ServiceArg::Kvs(entry)) => {
                if self.store.verify(entry.key)? {
                    Ok(())
                } else {
                    Err(KvsError::NotFound.into())
                }
            }
            (KvsCommand::Erase, _) => {
                self.store.erase()?;
                Ok(())
            }
            _ => Err(ServiceError::BadArgument),
        }
    }
}
