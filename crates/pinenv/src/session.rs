// Copyright (c) Contributors to the pinenv project.
// SPDX-License-Identifier: Apache-2.0

//! Sessions and the stack that enters and exits them.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use ulid::Ulid;

use crate::{Error, ResolvedPackage, Result};

#[cfg(test)]
#[path = "./session_test.rs"]
mod session_test;

/// Identifies one materialized session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(Ulid);

impl SessionId {
    pub(crate) fn new() -> Self {
        Self(Ulid::new())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The variables and search path in effect at one point of the stack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvState {
    pub variables: BTreeMap<String, String>,
    pub path: Vec<PathBuf>,
}

impl EnvState {
    /// Capture a state from a plain variable mapping, splitting its PATH.
    pub fn from_variables(variables: BTreeMap<String, String>) -> Self {
        let path = variables
            .get("PATH")
            .map(|p| crate::environment::split_path(p))
            .unwrap_or_default();
        Self { variables, path }
    }
}

/// One active environment. Read-only once materialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    id: SessionId,
    parent: Option<SessionId>,
    depth: usize,
    state: EnvState,
    packages: Vec<ResolvedPackage>,
}

impl Session {
    pub(crate) fn new(
        parent: Option<SessionId>,
        depth: usize,
        state: EnvState,
        packages: Vec<ResolvedPackage>,
    ) -> Self {
        Self {
            id: SessionId::new(),
            parent,
            depth,
            state,
            packages,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The session this one restores to on exit, if nested.
    pub fn parent(&self) -> Option<SessionId> {
        self.parent
    }

    /// Nesting depth, 1 for a top-level session.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn effective_variables(&self) -> &BTreeMap<String, String> {
        &self.state.variables
    }

    /// Bin directories in lookup order.
    pub fn active_path(&self) -> &[PathBuf] {
        &self.state.path
    }

    pub fn packages(&self) -> &[ResolvedPackage] {
        &self.packages
    }

    pub fn state(&self) -> &EnvState {
        &self.state
    }
}

/// Returned by [`SessionController::enter`], required to exit the session.
#[derive(Debug, PartialEq, Eq)]
pub struct SessionHandle {
    id: SessionId,
    depth: usize,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

struct Frame {
    session: Session,
    /// Exact state of the parent at the moment of entry.
    saved: EnvState,
}

/// Strict LIFO stack of entered sessions for one controlling process.
pub struct SessionController {
    base: EnvState,
    stack: Vec<Frame>,
}

impl SessionController {
    /// Create a controller on top of the caller's environment.
    pub fn new(base_env: BTreeMap<String, String>) -> Self {
        Self {
            base: EnvState::from_variables(base_env),
            stack: Vec::new(),
        }
    }

    /// The state in effect now: the top session's, or the base.
    pub fn current(&self) -> &EnvState {
        self.stack
            .last()
            .map(|frame| frame.session.state())
            .unwrap_or(&self.base)
    }

    pub fn current_id(&self) -> Option<SessionId> {
        self.stack.last().map(|frame| frame.session.id())
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.stack.last().map(|frame| &frame.session)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Push a materialized session onto the stack.
    ///
    /// The session must have been built on top of the current top of stack.
    pub fn enter(&mut self, session: Session) -> Result<SessionHandle> {
        if session.parent() != self.current_id() {
            return Err(Error::InvalidSessionOrder {
                expected: describe(self.current_id()),
                actual: format!("session {} built on {}", session.id(), describe(session.parent())),
            });
        }

        let handle = SessionHandle {
            id: session.id(),
            depth: self.stack.len() + 1,
        };
        let saved = self.current().clone();
        tracing::info!(session = %handle.id, depth = handle.depth, "entered session");
        self.stack.push(Frame { session, saved });
        Ok(handle)
    }

    /// Pop the top session, restoring its parent's state exactly.
    pub fn exit(&mut self, handle: &SessionHandle) -> Result<EnvState> {
        let top = self.current_id();
        if top != Some(handle.id) {
            return Err(Error::InvalidSessionOrder {
                expected: describe(top),
                actual: format!("session {}", handle.id),
            });
        }

        let frame = self.stack.pop().ok_or_else(|| Error::InvalidSessionOrder {
            expected: describe(None),
            actual: format!("session {}", handle.id),
        })?;
        tracing::info!(session = %handle.id, depth = handle.depth, "exited session");
        debug_assert_eq!(&frame.saved, self.current());
        Ok(frame.saved)
    }
}

fn describe(id: Option<SessionId>) -> String {
    match id {
        Some(id) => format!("session {id}"),
        None => "no open session".to_string(),
    }
}
