use crate::encode::{decode_image, ExportOptions, ExportedSet};
use crate::error::FaceMosaicError;
use crate::face_detector::FaceDetector;
use crate::session::{EditSession, SessionConfig};

/// Items processed so far in a batch stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// Completion as a whole percentage.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 100;
        }
        ((self.completed as f64 / self.total as f64) * 100.0).round() as u32
    }
}

/// What to do when one item of a batch fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop and return the item's error.
    #[default]
    Abort,
    /// Record the failure and carry on with the remaining items.
    Continue,
}

/// An input that could not be turned into a session.
#[derive(Debug)]
pub struct ItemFailure {
    /// 0-based position in the input list.
    pub index: usize,
    pub error: FaceMosaicError,
}

/// The sessions of one redaction run, in input order.
///
/// Preparation and export walk the items strictly one at a time, so only
/// one image is being decoded, detected or encoded at any moment.
#[derive(Debug, Default)]
pub struct Batch {
    sessions: Vec<EditSession>,
    failures: Vec<ItemFailure>,
}

impl Batch {
    /// Decode each input, run the detector on it, and open a session.
    ///
    /// `on_progress` fires after every item, failed ones included.
    pub fn prepare<I, B>(
        inputs: I,
        detector: Option<&dyn FaceDetector>,
        config: &SessionConfig,
        policy: FailurePolicy,
        mut on_progress: impl FnMut(Progress),
    ) -> Result<Self, FaceMosaicError>
    where
        I: IntoIterator<Item = B>,
        I::IntoIter: ExactSizeIterator,
        B: AsRef<[u8]>,
    {
        let inputs = inputs.into_iter();
        let total = inputs.len();
        let mut batch = Batch::default();

        for (index, input) in inputs.enumerate() {
            match prepare_one(input.as_ref(), detector, config) {
                Ok(session) => batch.sessions.push(session),
                Err(error) => match policy {
                    FailurePolicy::Abort => {
                        return Err(FaceMosaicError::Item {
                            index,
                            source: Box::new(error),
                        });
                    }
                    FailurePolicy::Continue => {
                        log::warn!("skipping item {index}: {error}");
                        batch.failures.push(ItemFailure { index, error });
                    }
                },
            }
            let progress = Progress {
                completed: index + 1,
                total,
            };
            log::info!("prepared {}/{}", progress.completed, progress.total);
            on_progress(progress);
        }

        Ok(batch)
    }

    /// Wrap already-built sessions.
    pub fn from_sessions(sessions: Vec<EditSession>) -> Self {
        Self {
            sessions,
            failures: Vec::new(),
        }
    }

    pub fn sessions(&self) -> &[EditSession] {
        &self.sessions
    }

    pub fn session_mut(&mut self, index: usize) -> Option<&mut EditSession> {
        self.sessions.get_mut(index)
    }

    pub fn failures(&self) -> &[ItemFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop every redaction and return all sessions to their originals.
    pub fn skip_all(&mut self) {
        for session in &mut self.sessions {
            session.go_back();
            session.reset();
        }
    }

    /// Encode the three images of every session, numbered from 1.
    pub fn export(
        &self,
        options: &ExportOptions,
        mut on_progress: impl FnMut(Progress),
    ) -> Result<Vec<ExportedSet>, FaceMosaicError> {
        options.validate()?;
        let total = self.sessions.len();
        let mut sets = Vec::with_capacity(total);

        for (index, session) in self.sessions.iter().enumerate() {
            let set = session
                .export(index + 1, options)
                .map_err(|error| FaceMosaicError::Item {
                    index,
                    source: Box::new(error),
                })?;
            if !set.face_detected {
                log::debug!("item {} exported with center crop", index + 1);
            }
            sets.push(set);

            let progress = Progress {
                completed: index + 1,
                total,
            };
            log::info!("exported {}/{}", progress.completed, progress.total);
            on_progress(progress);
        }

        Ok(sets)
    }
}

fn prepare_one(
    input: &[u8],
    detector: Option<&dyn FaceDetector>,
    config: &SessionConfig,
) -> Result<EditSession, FaceMosaicError> {
    let original = decode_image(input)?;
    let detection = detector.and_then(|d| d.detect(&original));
    if detection.is_none() {
        log::debug!("no face found; crop will fall back to center");
    }
    EditSession::new(original, detection, config.clone())
}
