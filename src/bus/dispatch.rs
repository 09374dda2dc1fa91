//! Registration table and command routing.

use core::sync::atomic::{AtomicU8, Ordering};

use log::{debug, info, warn};

use super::{
    BusError, DeinitError, RegistrationError, SERVICE_COUNT, Service, ServiceArg, ServiceId,
};

/// Fixed table of service slots plus the active bitmask.
pub struct DispatchBus {
    services: [Option<Box<dyn Service>>; SERVICE_COUNT],
    active: AtomicU8,
    initialized: bool,
}

impl DispatchBus {
    pub fn new() -> Self {
        Self {
            services: Default::default(),
            active: AtomicU8::new(0),
            initialized: false,
        }
    }

    /// Ready the bus for registrations.  Idempotent.
    pub fn init(&mut self) {
        if !self.initialized {
            info!("Bus: initialized ({} slots)", SERVICE_COUNT);
        }
        self.initialized = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Register `service` and run its `init`.
    ///
    /// Registering an already-active id is a no-op; the new instance is
    /// dropped and `init` does not run again.
    pub fn register(&mut self, mut service: Box<dyn Service>) -> Result<(), RegistrationError> {
        let id = service.id();
        if !self.initialized {
            warn!("Bus: register {} before init", id);
            return Err(RegistrationError::NotInitialized(id));
        }
        if self.is_active(id) {
            debug!("Bus: {} already registered", id);
            return Ok(());
        }

        service.init().map_err(|e| {
            warn!("Bus: {} init failed: {}", id, e);
            RegistrationError::InitFailed(id, e)
        })?;

        self.services[id.slot()] = Some(service);
        self.active.fetch_or(id.mask(), Ordering::Release);
        info!("Bus: {} registered", id);
        Ok(())
    }

    /// Remove `id`, running its `deinit`.  The bit is cleared even when
    /// `deinit` fails.
    pub fn deregister(&mut self, id: ServiceId) -> Result<(), DeinitError> {
        if !self.is_active(id) {
            return Ok(());
        }

        self.active.fetch_and(!id.mask(), Ordering::Release);
        let Some(mut service) = self.services[id.slot()].take() else {
            return Ok(());
        };

        let result = service.deinit().map_err(|cause| {
            warn!("Bus: {} deinit failed: {}", id, cause);
            DeinitError { id, cause }
        });
        info!("Bus: {} deregistered", id);
        result
    }

    /// Deregister every active service and mark the bus uninitialized.
    ///
    /// Keeps going past failing `deinit`s and returns the first error.
    pub fn deinit(&mut self) -> Result<(), DeinitError> {
        let mut first_err = None;
        for id in ServiceId::ALL {
            if let Err(e) = self.deregister(id) {
                first_err.get_or_insert(e);
            }
        }
        self.initialized = false;
        info!("Bus: deinitialized");
        first_err.map_or(Ok(()), Err)
    }

    /// Route `command` to `id`'s handler and return its result unchanged.
    pub fn send(&self, id: ServiceId, command: u8, arg: &mut ServiceArg) -> Result<(), BusError> {
        if !self.is_active(id) {
            debug!("Bus: send to inactive {}", id);
            return Err(BusError::NotActive(id));
        }
        match &self.services[id.slot()] {
            Some(service) => service.handle(command, arg).map_err(BusError::Handler),
            None => Err(BusError::NotActive(id)),
        }
    }

    pub fn is_active(&self, id: ServiceId) -> bool {
        self.active_mask() & id.mask() != 0
    }

    /// Bit `n` set ⇔ service id `n + 1` is active.
    pub fn active_mask(&self) -> u8 {
        self.active.load(Ordering::Acquire)
    }
}

impl Default for DispatchBus {
    fn default() -> Self {
        Self::new()
    }
}
