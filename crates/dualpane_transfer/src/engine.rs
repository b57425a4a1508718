//! Clipboard-style transfer engine: one pending source, observers, paste.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::copy::paste_entry;
use crate::report::ReportPaste;
use crate::spec::{
    EnumTransferMode, EventTransfer, SpecTransferOptions, SpecTransferRequest, TransferResult,
};

/// Boxed observer callback.
pub type FnTransferObserver = Box<dyn FnMut(&EventTransfer) + Send>;

/// Handle returned by [`TransferEngine::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Holds at most one pending copy/cut request and performs pastes.
///
/// State machine: `Idle` until the first `copy`/`cut`, then `Armed` for the
/// rest of its life. `paste` never disarms; only another `copy`/`cut`
/// replaces the pending source.
///
/// `cut` does not move: the source is left in place after a paste, exactly
/// like `copy`. Only the emitted notification differs.
///
/// Observers run synchronously on the caller's thread, in subscription order,
/// before the triggering method returns.
pub struct TransferEngine {
    spec_request: SpecTransferRequest,
    spec_tf_options: SpecTransferOptions,
    l_observers: Vec<(ObserverId, FnTransferObserver)>,
    n_observer_next: u64,
}

impl Default for TransferEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TransferEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferEngine")
            .field("spec_request", &self.spec_request)
            .field("spec_tf_options", &self.spec_tf_options)
            .field("n_observers", &self.l_observers.len())
            .finish()
    }
}

impl TransferEngine {
    /// Idle engine with default options.
    pub fn new() -> Self {
        Self::with_options(SpecTransferOptions::default())
    }

    /// Idle engine with explicit paste options.
    pub fn with_options(spec_tf_options: SpecTransferOptions) -> Self {
        Self {
            spec_request: SpecTransferRequest::default(),
            spec_tf_options,
            l_observers: Vec::new(),
            n_observer_next: 0,
        }
    }

    pub fn options(&self) -> &SpecTransferOptions {
        &self.spec_tf_options
    }

    pub fn request(&self) -> &SpecTransferRequest {
        &self.spec_request
    }

    pub fn mode(&self) -> EnumTransferMode {
        self.spec_request.mode
    }

    /// Pending source, or `None` unless [`Self::is_armed`].
    pub fn path_source(&self) -> Option<&Path> {
        self.spec_request
            .is_armed()
            .then_some(self.spec_request.path_source.as_path())
    }

    pub fn is_armed(&self) -> bool {
        self.spec_request.is_armed()
    }

    /// Register an observer for every subsequent notification.
    pub fn subscribe<F>(&mut self, observer: F) -> ObserverId
    where
        F: FnMut(&EventTransfer) + Send + 'static,
    {
        let observer_id = ObserverId(self.n_observer_next);
        self.n_observer_next += 1;
        self.l_observers.push((observer_id, Box::new(observer)));
        observer_id
    }

    /// Drop an observer. Returns `false` for unknown handles.
    pub fn unsubscribe(&mut self, observer_id: ObserverId) -> bool {
        let n_before = self.l_observers.len();
        self.l_observers.retain(|(id, _)| *id != observer_id);
        self.l_observers.len() != n_before
    }

    /// Arm `path_source` in copy mode. Existence is checked at paste time.
    pub fn copy<P: Into<PathBuf>>(&mut self, path_source: P) {
        self.arm(path_source.into(), EnumTransferMode::Copy);
    }

    /// Arm `path_source` in cut mode. Existence is checked at paste time.
    pub fn cut<P: Into<PathBuf>>(&mut self, path_source: P) {
        self.arm(path_source.into(), EnumTransferMode::Cut);
    }

    /// Paste the pending source to `path_destination`.
    ///
    /// `path_destination` is the full path of the new entry, not its parent
    /// directory. Returns `Ok(false)` when nothing is armed.
    pub fn paste<P: AsRef<Path>>(&mut self, path_destination: P) -> TransferResult<bool> {
        Ok(self.paste_with_report(path_destination)?.is_some())
    }

    /// Same as [`Self::paste`] but returns the paste report.
    pub fn paste_with_report<P: AsRef<Path>>(
        &mut self,
        path_destination: P,
    ) -> TransferResult<Option<ReportPaste>> {
        let path_dst = path_destination.as_ref();
        if !self.spec_request.is_armed() {
            debug!(destination = %path_dst.display(), "paste ignored; nothing armed");
            return Ok(None);
        }

        let path_src = self.spec_request.path_source.clone();
        let report_paste = paste_entry(&path_src, path_dst, &self.spec_tf_options)
            .inspect_err(|e| {
                warn!(
                    source = %path_src.display(),
                    destination = %path_dst.display(),
                    mode = self.spec_request.mode.as_str(),
                    error = %e,
                    "paste failed"
                );
            })?;

        info!(
            source = %path_src.display(),
            destination = %report_paste.path_destination.display(),
            mode = self.spec_request.mode.as_str(),
            renamed = report_paste.if_renamed,
            files = report_paste.cnt_files,
            dirs = report_paste.cnt_dirs,
            bytes = report_paste.cnt_bytes,
            "pasted"
        );
        for warning in &report_paste.warnings {
            warn!(destination = %report_paste.path_destination.display(), "{warning}");
        }

        self.emit(&EventTransfer::Pasted(report_paste.path_destination.clone()));
        Ok(Some(report_paste))
    }

    fn arm(&mut self, path_source: PathBuf, mode: EnumTransferMode) {
        info!(source = %path_source.display(), mode = mode.as_str(), "armed");
        let event = match mode {
            EnumTransferMode::Cut => EventTransfer::CutMarked(path_source.clone()),
            EnumTransferMode::Copy | EnumTransferMode::None => {
                EventTransfer::Copied(path_source.clone())
            }
        };
        self.spec_request = SpecTransferRequest { path_source, mode };
        self.emit(&event);
    }

    fn emit(&mut self, event: &EventTransfer) {
        for (_, observer) in &mut self.l_observers {
            observer(event);
        }
    }
}
