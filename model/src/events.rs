/*!

Watch events of OpenShift projects as seen by one user. A user sees a project once it is granted a
role in it and stops seeing it once the grant or the project is removed, so the events a user's
watch delivers describe what that user may access.

!*/

use crate::constants::{WATCH_EVENT_TIMEOUT, WATCH_QUIET_PERIOD};
use crate::error::{self, Result};
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use kube::api::{DynamicObject, WatchEvent};
use kube::ResourceExt;
use log::debug;
use snafu::{ensure, OptionExt, ResultExt};
use std::collections::HashSet;
use tokio::time::timeout;

const TERMINATING: &str = "Terminating";

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum EventKind {
    Added,
    Modified,
    Deleted,
}

/// An open watch of projects.
pub struct ProjectEvents {
    stream: BoxStream<'static, kube::Result<WatchEvent<DynamicObject>>>,
}

impl std::fmt::Debug for ProjectEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectEvents").finish_non_exhaustive()
    }
}

impl ProjectEvents {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = kube::Result<WatchEvent<DynamicObject>>> + Send + 'static,
    {
        Self {
            stream: stream.boxed(),
        }
    }

    /// Wait for a `kind` event of `project`, ignoring every other event.
    pub async fn wait_for(&mut self, kind: EventKind, project: &str) -> Result<()> {
        timeout(WATCH_EVENT_TIMEOUT, self.next_of(kind, project))
            .await
            .ok()
            .context(error::TimeoutSnafu {
                what: format!("{:?} event of project {}", kind, project),
                timeout: WATCH_EVENT_TIMEOUT,
            })?
    }

    /// Wait for a `kind` event of `project` while requiring that nothing else happens in the
    /// meantime, apart from modifications. For `Deleted`, `project` may be modified while it
    /// terminates but it must not stop terminating.
    pub async fn wait_for_only(&mut self, kind: EventKind, project: &str) -> Result<()> {
        timeout(WATCH_EVENT_TIMEOUT, self.next_only(kind, project))
            .await
            .ok()
            .context(error::TimeoutSnafu {
                what: format!("only a {:?} event of project {}", kind, project),
                timeout: WATCH_EVENT_TIMEOUT,
            })?
    }

    async fn next_of(&mut self, kind: EventKind, project: &str) -> Result<()> {
        loop {
            let (event, object) = self.next_event().await?;
            if event == kind && object.name_any() == project {
                return Ok(());
            }
        }
    }

    async fn next_only(&mut self, kind: EventKind, project: &str) -> Result<()> {
        let mut terminated = HashSet::new();
        loop {
            let (event, object) = self.next_event().await?;
            let name = object.name_any();
            if name == project && event == kind {
                return Ok(());
            }
            ensure!(
                event == EventKind::Modified && (name != project || kind == EventKind::Deleted),
                error::CheckFailedSnafu {
                    description: format!(
                        "got an unexpected {:?} event of project {} waiting for {:?} of {}",
                        event, name, kind, project
                    ),
                }
            );
            if name == project {
                let terminating = phase(&object) == Some(TERMINATING);
                ensure!(
                    terminating || !terminated.contains(&name),
                    error::CheckFailedSnafu {
                        description: format!(
                            "project {} was terminating, but then stopped terminating",
                            name
                        ),
                    }
                );
                if terminating {
                    terminated.insert(name);
                }
            }
        }
    }

    /// Require that no events arrive for a quiet period, apart from modifications of `allowed`.
    pub async fn expect_quiet(&mut self, allowed: Option<&str>) -> Result<()> {
        loop {
            let (event, object) = match timeout(WATCH_QUIET_PERIOD, self.next_event()).await {
                Ok(event) => event?,
                Err(_) => return Ok(()),
            };
            let name = object.name_any();
            ensure!(
                event == EventKind::Modified && allowed == Some(name.as_str()),
                error::CheckFailedSnafu {
                    description: format!(
                        "got an unexpected {:?} event of project {}",
                        event, name
                    ),
                }
            );
        }
    }

    async fn next_event(&mut self) -> Result<(EventKind, DynamicObject)> {
        loop {
            let event = self
                .stream
                .next()
                .await
                .context(error::WatchSnafu {
                    what: "projects",
                    message: "the server closed the watch",
                })?
                .context(error::KubeSnafu {
                    action: "read project watch",
                })?;
            let (kind, object) = match event {
                WatchEvent::Added(object) => (EventKind::Added, object),
                WatchEvent::Modified(object) => (EventKind::Modified, object),
                WatchEvent::Deleted(object) => (EventKind::Deleted, object),
                WatchEvent::Bookmark(_) => continue,
                WatchEvent::Error(e) => {
                    return error::WatchSnafu {
                        what: "projects",
                        message: e.message,
                    }
                    .fail()
                }
            };
            debug!("got {:?} of project {}", kind, object.name_any());
            return Ok((kind, object));
        }
    }
}

fn phase(project: &DynamicObject) -> Option<&str> {
    project.data.get("status")?.get("phase")?.as_str()
}
