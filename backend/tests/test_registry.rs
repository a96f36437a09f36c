//! Registry and loader tests
//!
//! Name resolution, shared-library linkage on the search path, interface
//! version checks, and the process-wide single-instance slot.
//!
//! The native slot is global to the test process, so every test that
//! creates a handle takes `SERIAL` first and finalizes what it creates.

use evgen_core::event::EventRecord;
use evgen_core::registry::{active_instance, BINDING_ABI_VERSION};
use evgen_core::{
    AdapterError, BeamSpec, BindingDescriptor, GeneratorAdapter, Linkage, Registry, RegistryError,
    RunError, SearchPath,
};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tempfile::TempDir;

static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Mock binding
// ============================================================================

struct NullAdapter {
    finalized: Arc<AtomicUsize>,
}

impl GeneratorAdapter for NullAdapter {
    fn name(&self) -> &str {
        "null"
    }

    fn set_initial_state(&mut self, _: &BeamSpec, _: &BeamSpec) -> Result<(), AdapterError> {
        Ok(())
    }

    fn set_seed(&mut self, _: u64) -> Result<(), AdapterError> {
        Ok(())
    }

    fn set_param(&mut self, key: &str, _: &str) -> Result<(), AdapterError> {
        Err(AdapterError::UnknownParameter {
            key: key.to_string(),
        })
    }

    fn generate_event(&mut self) -> Result<(), AdapterError> {
        Ok(())
    }

    fn event_record(&self) -> Result<EventRecord, AdapterError> {
        Err(AdapterError::NoEventAvailable)
    }

    fn finalize(&mut self) -> Result<(), AdapterError> {
        self.finalized.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn null_binding(name: &str, finalized: Arc<AtomicUsize>) -> BindingDescriptor {
    BindingDescriptor::new(
        name,
        "null",
        "does nothing",
        Box::new(move || {
            Ok(Box::new(NullAdapter {
                finalized: finalized.clone(),
            }) as Box<dyn GeneratorAdapter>)
        }),
    )
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_unknown_generator_is_configuration_error() {
    let _serial = serial();
    let registry = Registry::with_builtin(SearchPath::default());
    let err = registry.create("pythia9").unwrap_err();

    match &err {
        RegistryError::UnknownGenerator { name, available } => {
            assert_eq!(name, "pythia9");
            assert_eq!(available, &["p1", "h1", "p1me"]);
        }
        other => panic!("expected UnknownGenerator, got {:?}", other),
    }
    assert_eq!(RunError::from(err).exit_code(), 1);
    assert_eq!(active_instance(), None);
}

#[test]
fn test_shared_component_needs_library_on_search_path() {
    let _serial = serial();
    let dir = TempDir::new().unwrap();
    let finalized = Arc::new(AtomicUsize::new(0));

    let mut registry = Registry::new(SearchPath::new([dir.path().to_path_buf()]));
    registry
        .register(null_binding("ext", finalized.clone()).with_linkage(Linkage::Shared {
            component: "evgenext".to_string(),
        }))
        .unwrap();

    assert!(registry.resolvable().is_empty());
    assert_eq!(registry.names(), vec!["ext"]);
    match registry.create("ext").unwrap_err() {
        RegistryError::LibraryLoad { name, reason, available } => {
            assert_eq!(name, "ext");
            assert!(reason.contains(&Linkage::library_file("evgenext")));
            assert!(available.is_empty());
        }
        other => panic!("expected LibraryLoad, got {:?}", other),
    }
    assert_eq!(active_instance(), None);

    fs::write(dir.path().join(Linkage::library_file("evgenext")), b"").unwrap();
    assert_eq!(registry.resolvable(), vec!["ext"]);

    let mut handle = registry.create("ext").unwrap();
    handle.finalize().unwrap();
    assert_eq!(finalized.load(Ordering::SeqCst), 1);
}

#[test]
fn test_interface_version_mismatch_not_loadable() {
    let finalized = Arc::new(AtomicUsize::new(0));
    let mut registry = Registry::new(SearchPath::default());
    registry
        .register(null_binding("old", finalized).with_abi_version(BINDING_ABI_VERSION + 1))
        .unwrap();

    assert!(registry.resolvable().is_empty());
    assert!(registry.describe("OLD").is_some());
    assert!(matches!(
        registry.create("old"),
        Err(RegistryError::LibraryLoad { .. })
    ));
}

#[test]
fn test_check_resolves_without_claiming_slot() {
    let _serial = serial();
    let registry = Registry::with_builtin(SearchPath::default());

    assert_eq!(registry.check(" P1me ").unwrap().name, "p1me");
    assert_eq!(active_instance(), None);

    let err = registry.check("pythia9").unwrap_err();
    assert_eq!(err.available(), ["p1", "h1", "p1me"]);
    assert!(err.to_string().contains("h1"));

    // A live instance does not make other names fail the check
    let mut live = registry.create("p1").unwrap();
    assert!(registry.check("h1").is_ok());
    live.finalize().unwrap();
}

#[test]
fn test_duplicate_names_rejected() {
    let mut registry = Registry::with_builtin(SearchPath::default());
    let err = registry
        .register(null_binding("P1", Arc::new(AtomicUsize::new(0))))
        .unwrap_err();
    assert_eq!(err, RegistryError::DuplicateBinding("P1".to_string()));
    assert_eq!(registry.names().len(), 3);
}

// ============================================================================
// Single instance
// ============================================================================

#[test]
fn test_second_create_refused_until_finalize() {
    let _serial = serial();
    let registry = Registry::with_builtin(SearchPath::default());

    let mut first = registry.create("h1").unwrap();
    let err = registry.create("p1me").unwrap_err();
    assert_eq!(
        err,
        RegistryError::InstanceActive {
            active: "h1".to_string()
        }
    );
    assert_eq!(RunError::from(err).exit_code(), 1);

    first.finalize().unwrap();
    let mut second = registry.create("p1me").unwrap();
    assert_eq!(active_instance().as_deref(), Some("p1me"));
    second.finalize().unwrap();
    assert_eq!(active_instance(), None);
}

#[test]
fn test_failed_factory_releases_slot() {
    let _serial = serial();
    let mut registry = Registry::new(SearchPath::default());
    registry
        .register(BindingDescriptor::new(
            "broken",
            "null",
            "factory always fails",
            Box::new(|| -> Result<Box<dyn GeneratorAdapter>, AdapterError> {
                Err(AdapterError::Generation("cannot open native library".to_string()))
            }),
        ))
        .unwrap();

    match registry.create("broken").unwrap_err() {
        RegistryError::LibraryLoad { reason, .. } => {
            assert!(reason.contains("cannot open native library"))
        }
        other => panic!("expected LibraryLoad, got {:?}", other),
    }
    assert_eq!(active_instance(), None);
}
