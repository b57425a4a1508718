use std::sync::{Arc, Mutex, PoisonError};

use dualpane_transfer::{
    EnumDeleteOutcome, EnumTransferSymlinkStrategy, EventTransfer, SpecTransferOptions,
    TransferEngine, TransferError, delete_entry, rename_entry, unique_name,
};
use pyo3::exceptions::{PyFileExistsError, PyFileNotFoundError, PyOSError, PyValueError};
use pyo3::prelude::*;

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "dualpane.transfer.engine.v1";
const C_BRIDGE_TRANSPORT: &str = "rust_native";

fn map_transfer_error(exception: TransferError) -> PyErr {
    let message = exception.to_string();
    match exception {
        TransferError::SourceNotFound { .. } | TransferError::BrokenSymlink { .. } => {
            PyFileNotFoundError::new_err(message)
        }
        TransferError::DestinationExists { .. } => PyFileExistsError::new_err(message),
        TransferError::InvalidName { .. } | TransferError::DestinationInsideSource { .. } => {
            PyValueError::new_err(message)
        }
        TransferError::UnsupportedSourceType { .. } | TransferError::Io { .. } => {
            PyOSError::new_err(message)
        }
    }
}

/// Engine wrapper. Rust-side notifications are queued and replayed to the
/// Python callbacks after each call, on the calling thread, in order.
#[pyclass(name = "TransferEngine", unsendable)]
struct PyTransferEngine {
    engine: TransferEngine,
    queue_events: Arc<Mutex<Vec<EventTransfer>>>,
    l_callbacks: Vec<Py<PyAny>>,
}

impl PyTransferEngine {
    fn dispatch_events(&self, py: Python<'_>) -> PyResult<()> {
        let l_events = std::mem::take(
            &mut *self
                .queue_events
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        for event in l_events {
            let c_path = event.path().to_string_lossy().to_string();
            for callback in &self.l_callbacks {
                callback.call1(py, (event.kind(), c_path.as_str()))?;
            }
        }
        Ok(())
    }
}

#[pymethods]
impl PyTransferEngine {
    #[new]
    #[pyo3(signature = (
        preserve_metadata = true,
        copy_xattrs = true,
        copy_symlinks = false,
        num_workers_max = None
    ))]
    fn new(
        preserve_metadata: bool,
        copy_xattrs: bool,
        copy_symlinks: bool,
        num_workers_max: Option<usize>,
    ) -> Self {
        let spec_tf_options = SpecTransferOptions {
            rule_symlink: if copy_symlinks {
                EnumTransferSymlinkStrategy::CopySymlinks
            } else {
                EnumTransferSymlinkStrategy::Dereference
            },
            if_preserve_metadata: preserve_metadata,
            if_copy_xattrs: copy_xattrs,
            num_workers_max,
        };
        let mut engine = TransferEngine::with_options(spec_tf_options);
        let queue_events = Arc::new(Mutex::new(Vec::new()));
        let queue_events_sink = Arc::clone(&queue_events);
        engine.subscribe(move |event| {
            queue_events_sink
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
        });
        Self {
            engine,
            queue_events,
            l_callbacks: Vec::new(),
        }
    }

    /// Register `callback(kind, path)`; `kind` is `copied`, `cut` or `pasted`.
    fn subscribe(&mut self, callback: Py<PyAny>) {
        self.l_callbacks.push(callback);
    }

    #[getter]
    fn source_path(&self) -> Option<String> {
        self.engine
            .path_source()
            .map(|path| path.to_string_lossy().to_string())
    }

    #[getter]
    fn mode(&self) -> &'static str {
        self.engine.mode().as_str()
    }

    #[getter]
    fn is_armed(&self) -> bool {
        self.engine.is_armed()
    }

    fn copy(&mut self, py: Python<'_>, source_path: String) -> PyResult<()> {
        self.engine.copy(source_path);
        self.dispatch_events(py)
    }

    fn cut(&mut self, py: Python<'_>, source_path: String) -> PyResult<()> {
        self.engine.cut(source_path);
        self.dispatch_events(py)
    }

    /// Returns `False` when nothing is armed; raises on filesystem failure.
    fn paste(&mut self, py: Python<'_>, destination_path: String) -> PyResult<bool> {
        let engine = &mut self.engine;
        let b_pasted = py
            .allow_threads(move || engine.paste(destination_path))
            .map_err(map_transfer_error)?;
        self.dispatch_events(py)?;
        Ok(b_pasted)
    }
}

#[pyfunction(name = "unique_name")]
fn unique_name_py(path: String) -> String {
    unique_name(path).to_string_lossy().to_string()
}

#[pyfunction(name = "delete_entry")]
fn delete_entry_py(py: Python<'_>, path: String) -> PyResult<&'static str> {
    let outcome = py
        .allow_threads(|| delete_entry(path))
        .map_err(map_transfer_error)?;
    Ok(match outcome {
        EnumDeleteOutcome::Deleted => "deleted",
        EnumDeleteOutcome::SkippedProtected => "skipped_protected",
        EnumDeleteOutcome::NotFound => "not_found",
    })
}

#[pyfunction(name = "rename_entry")]
fn rename_entry_py(path: String, new_name: String) -> PyResult<String> {
    let path_new = rename_entry(path, &new_name).map_err(map_transfer_error)?;
    Ok(path_new.to_string_lossy().to_string())
}

#[pymodule]
fn _dualpane_transfer_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PyTransferEngine>()?;
    module.add_function(wrap_pyfunction!(unique_name_py, module)?)?;
    module.add_function(wrap_pyfunction!(delete_entry_py, module)?)?;
    module.add_function(wrap_pyfunction!(rename_entry_py, module)?)?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}
