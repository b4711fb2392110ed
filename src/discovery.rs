
use std::collections::HashMap;

use lazy_static::lazy_static;
use log::{debug, warn};

use crate::bus::{Identity, ResourceManager, Session, ALL_INSTRUMENTS};
use crate::devices::ds1000z::Ds1000z;
use crate::devices::sdg2000x::Sdg2000x;
use crate::devices::{FunctionGenerator, Oscilloscope};
use crate::error::{Error, Result};

/// Builds one device instance from a session that already answered `*IDN?`
/// with a model this factory is registered for.
pub type Factory<T> = fn(Box<dyn Session>, &str) -> Result<T>;

/// Maps reported model strings onto device factories.  Matching is exact; a
/// physical unit whose firmware reports two different model strings gets two
/// entries pointing at the same factory.
pub struct Registry<T> {
    entries: HashMap<String, Factory<T>>,
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Registry { entries: HashMap::new() }
    }

    pub fn register(&mut self, model: &str, factory: Factory<T>) {
        self.entries.insert(model.to_owned(), factory);
    }

    pub fn resolve(&self, model: &str) -> Option<Factory<T>> {
        self.entries.get(model).copied()
    }

    pub fn models(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|model| model.as_str())
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one discovery pass.
pub struct Discovered<T> {
    pub devices: Vec<T>,
    /// True when at least one enumerated resource did not classify as a
    /// registered model.  A single flag only: it cannot say how many
    /// resources went unmatched, or which.
    pub unknown_device_present: bool,
}

impl<T> Default for Discovered<T> {
    fn default() -> Self {
        Discovered { devices: Vec::new(), unknown_device_present: false }
    }
}

/// Enumerate the bus and instantiate a driver for every resource whose
/// reported model is registered.
///
/// An empty bus is a normal result, not an error: backends that signal "no
/// resources found" through an enumeration failure are folded into an empty
/// `Discovered`.  Only a missing backend propagates, so applications can tell
/// "nothing connected" from "nothing installed".  A resource that fails to
/// open or identify is skipped with a warning and recorded through the
/// unknown-device flag; it never aborts the rest of the scan.
pub fn discover<T>(rm: &mut dyn ResourceManager, registry: &Registry<T>) -> Result<Discovered<T>> {
    let resources: Vec<String> = match rm.enumerate(ALL_INSTRUMENTS) {
        Ok(resources) => resources,
        Err(Error::BackendMissing(reason)) => return Err(Error::BackendMissing(reason)),
        Err(e) => {
            debug!("resource enumeration found nothing usable: {}", e);
            return Ok(Discovered::default());
        }
    };

    let mut found = Discovered::default();
    for resource in &resources {
        match probe(rm, registry, resource) {
            Ok(Some(device)) => found.devices.push(device),
            Ok(None) => found.unknown_device_present = true,
            Err(e) => {
                warn!("skipping {}: {}", resource, e);
                found.unknown_device_present = true;
            }
        }
    }

    Ok(found)
}

fn probe<T>(
    rm: &mut dyn ResourceManager,
    registry: &Registry<T>,
    resource: &str,
) -> Result<Option<T>> {
    let mut session: Box<dyn Session> = rm.open(resource)?;
    let idn: String = session.query_line("*IDN?")?;
    let identity: Identity = Identity::parse(&idn)?;

    match registry.resolve(&identity.model) {
        Some(factory) => factory(session, resource).map(Some),
        None => {
            debug!("no driver registered for model {:?} at {}", identity.model, resource);
            Ok(None)
        }
    }
}

fn ds1000z_factory(session: Box<dyn Session>, resource: &str) -> Result<Box<dyn Oscilloscope>> {
    Ok(Box::new(Ds1000z::with_session(session, resource)?))
}

fn sdg2000x_factory(session: Box<dyn Session>, resource: &str) -> Result<Box<dyn FunctionGenerator>> {
    Ok(Box::new(Sdg2000x::with_session(session, resource)?))
}

lazy_static! {
    /// Oscilloscope models with a driver in this crate.
    pub static ref OSCILLOSCOPES: Registry<Box<dyn Oscilloscope>> = {
        let mut registry = Registry::new();
        for model in &["DS1054Z", "DS1074Z", "DS1104Z", "DS1074Z-S", "DS1104Z-S"] {
            registry.register(model, ds1000z_factory);
        }
        registry
    };

    /// Function generator models with a driver in this crate.
    pub static ref GENERATORS: Registry<Box<dyn FunctionGenerator>> = {
        let mut registry = Registry::new();
        for model in &["SDG2042X", "SDG2082X", "SDG2122X"] {
            registry.register(model, sdg2000x_factory);
        }
        // Some SDG2000X firmware revisions report the series name instead of
        // the model, so the series name maps to the same driver
        registry.register("SDG2000X", sdg2000x_factory);
        registry
    };
}

pub fn discover_oscilloscopes(
    rm: &mut dyn ResourceManager,
) -> Result<Discovered<Box<dyn Oscilloscope>>> {
    discover(rm, &OSCILLOSCOPES)
}

pub fn discover_generators(
    rm: &mut dyn ResourceManager,
) -> Result<Discovered<Box<dyn FunctionGenerator>>> {
    discover(rm, &GENERATORS)
}
