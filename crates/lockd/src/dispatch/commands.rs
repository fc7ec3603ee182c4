//! The command table: one handler per protocol keyword.

use lockd_config::Features;
use lockd_protocol::{Command, DISABLED_REPLY, Request};
use tracing::warn;

use crate::HolderId;
use crate::state::ServerState;

use super::{DISPATCH_TARGET, Reply};

/// Executes `request` on behalf of `holder`.
pub(super) fn execute(
    state: &mut ServerState,
    features: Features,
    holder: &HolderId,
    request: &Request,
) -> Reply {
    let argument = request.argument.as_str();
    let mut session = Session {
        state,
        features,
        holder,
    };
    match request.command {
        Command::Get => session.get(argument),
        Command::Release => session.release(argument),
        Command::Inspect => session.inspect(argument),
        Command::Dump => session.dump(argument),
        Command::SharedGet => session.shared_get(argument),
        Command::SharedRelease => session.shared_release(argument),
        Command::SharedInspect => session.shared_inspect(argument),
        Command::SharedDump => session.shared_dump(argument),
        Command::RawDump => session.raw_dump(argument),
        Command::Me => session.me(),
        Command::Iam => session.iam(argument),
        Command::Who => session.who(argument),
        Command::Stats => session.stats(),
    }
}

struct Session<'a> {
    state: &'a mut ServerState,
    features: Features,
    holder: &'a HolderId,
}

impl Session<'_> {
    fn get(&mut self, name: &str) -> Reply {
        if self.state.locks.acquire_exclusive(name, self.holder) {
            format!("1 Lock Get Success: {name}").into()
        } else {
            format!("0 Lock Get Failure: {name}").into()
        }
    }

    fn release(&mut self, name: &str) -> Reply {
        if self.state.locks.release_exclusive(name, self.holder) {
            format!("1 Lock Release Success: {name}").into()
        } else {
            format!("0 Lock Release Failure: {name}").into()
        }
    }

    fn inspect(&self, name: &str) -> Reply {
        if self.state.locks.is_locked(name) {
            format!("1 Lock Is Locked: {name}").into()
        } else {
            format!("0 Lock Not Locked: {name}").into()
        }
    }

    fn dump(&self, name: &str) -> Reply {
        if !self.features.dump {
            return DISABLED_REPLY.into();
        }
        if name.is_empty() {
            let lines = self
                .state
                .locks
                .exclusive_entries()
                .map(|(lock, owner)| format!("{lock}: {}", self.display_name(owner)))
                .collect();
            return Reply::Lines(lines);
        }
        match self.state.locks.exclusive_holder(name) {
            Some(owner) => format!("{name}: {}", self.display_name(owner)).into(),
            None => Reply::Silent,
        }
    }

    fn shared_get(&mut self, name: &str) -> Reply {
        let count = self.state.locks.acquire_shared(name, self.holder);
        format!("{count} Shared Lock Get Success: {name}").into()
    }

    fn shared_release(&mut self, name: &str) -> Reply {
        if self.state.locks.release_shared(name, self.holder) {
            format!("1 Shared Lock Release Success: {name}").into()
        } else {
            format!("0 Shared Lock Release Failure: {name}").into()
        }
    }

    fn shared_inspect(&self, name: &str) -> Reply {
        match self.state.locks.inspect_shared(name, self.holder) {
            Some(count) => format!("{count} Shared Lock Is Locked: {name}").into(),
            None => format!("0 Shared Lock Not Locked: {name}").into(),
        }
    }

    fn shared_dump(&self, name: &str) -> Reply {
        if !self.features.dump {
            return DISABLED_REPLY.into();
        }
        let lines = if name.is_empty() {
            self.state
                .locks
                .shared_entries()
                .flat_map(|(lock, holders)| {
                    holders
                        .iter()
                        .map(move |owner| format!("{lock}: {}", self.display_name(owner)))
                })
                .collect()
        } else {
            self.state
                .locks
                .shared_holders(name)
                .iter()
                .map(|owner| format!("{name}: {}", self.display_name(owner)))
                .collect()
        };
        Reply::Lines(lines)
    }

    fn raw_dump(&self, table: &str) -> Reply {
        if !self.features.dump {
            return DISABLED_REPLY.into();
        }
        let rendered = if table == "shared" {
            self.state.locks.shared_json()
        } else {
            self.state.locks.exclusive_json()
        };
        match rendered {
            Ok(json) => Reply::Line(json),
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    error = %error,
                    "failed to render lock table"
                );
                Reply::Silent
            }
        }
    }

    fn me(&self) -> Reply {
        format!("1 {} {}", self.holder, self.display_name(self.holder)).into()
    }

    fn iam(&mut self, name: &str) -> Reply {
        if !self.features.registry {
            return DISABLED_REPLY.into();
        }
        self.state.registry.set_name(self.holder, name);
        "1 ok".into()
    }

    fn who(&self, name: &str) -> Reply {
        if !self.features.listing() {
            return DISABLED_REPLY.into();
        }
        let registry = &self.state.registry;
        let lines = if name.is_empty() {
            registry
                .listing()
                .into_iter()
                .map(|(friendly, owner)| format!("{owner}: {friendly}"))
                .collect()
        } else {
            registry
                .find(name)
                .map(|owner| format!("{owner}: {name}"))
                .into_iter()
                .collect()
        };
        Reply::Lines(lines)
    }

    fn stats(&self) -> Reply {
        let locks = &self.state.locks;
        let lines = self
            .state
            .stats
            .snapshot(locks.exclusive_count(), locks.shared_count())
            .into_iter()
            .map(|(key, value)| format!("{key}: {value}"))
            .collect();
        Reply::Lines(lines)
    }

    fn display_name<'h>(&'h self, holder: &'h HolderId) -> &'h str {
        if self.features.registry {
            self.state.registry.display_name(holder)
        } else {
            holder.as_str()
        }
    }
}
