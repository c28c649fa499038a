//! Link protocol: selection state, pairwise validation and remote sync.
//!
//! Links are applied optimistically. A successful local validation marks both
//! nodes linked and emits [`LinkEvent::Created`] immediately; the remote
//! `upsert_link` call runs as a future polled from the frame loop and can only
//! add [`LinkEvent::Evolve`] later. A failed sync is logged and counted, the
//! local state is never rolled back.

use crate::constants::*;
use crate::error::{LinkRejected, RemoteSyncError};
use crate::nodes::{NodeId, NodeLayer};
use crate::theme::Theme;
use futures::task::noop_waker_ref;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Arguments of the remote `upsert_link` RPC.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertLink {
    pub user_id: String,
    pub seed: u64,
    pub node_a: u32,
    pub node_b: u32,
    pub theme: Theme,
    pub intensity: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertLinkReply {
    pub total_links: u32,
    pub theme_links: u32,
    pub milestone_added: bool,
    pub milestone_level: u32,
}

pub type SyncFuture = Pin<Box<dyn Future<Output = Result<UpsertLinkReply, RemoteSyncError>>>>;

/// Transport for the link RPC. Implementations start the request and return
/// a future; they never block.
pub trait LinkSync {
    fn upsert_link(&self, request: UpsertLink) -> SyncFuture;
}

/// Transport that acknowledges nothing; used when no remote is configured.
pub struct OfflineSync;

impl LinkSync for OfflineSync {
    fn upsert_link(&self, _request: UpsertLink) -> SyncFuture {
        Box::pin(futures::future::ready(Err(RemoteSyncError::Transport(
            "offline".into(),
        ))))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LinkEvent {
    Created {
        from: NodeId,
        to: NodeId,
        theme: Theme,
    },
    Evolve {
        theme: Theme,
        level: u32,
        theme_links: u32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Selection {
    None,
    Selected(NodeId),
}

#[derive(Clone, Debug, PartialEq)]
pub enum SelectOutcome {
    Selected(NodeId),
    Deselected,
    Linked { from: NodeId, to: NodeId },
    Rejected(LinkRejected),
}

#[derive(Clone, Copy, Debug)]
pub struct LinkRules {
    pub cooldown_ms: f64,
    pub max_link_distance: f32,
}

impl LinkRules {
    pub fn for_depth(depth: f32) -> Self {
        Self {
            cooldown_ms: LINK_COOLDOWN_MS,
            max_link_distance: depth * MAX_LINK_DISTANCE_FRACTION,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub issued: u32,
    pub acknowledged: u32,
    pub failed: u32,
}

struct PendingSync {
    theme: Theme,
    from: NodeId,
    to: NodeId,
    future: SyncFuture,
}

pub struct LinkEngine {
    rules: LinkRules,
    selection: Selection,
    last_link_ms: Option<f64>,
    user_id: String,
    seed: u64,
    transport: Box<dyn LinkSync>,
    pending: Vec<PendingSync>,
    stats: SyncStats,
    disposed: bool,
}

impl LinkEngine {
    pub fn new(rules: LinkRules, user_id: String, seed: u64, transport: Box<dyn LinkSync>) -> Self {
        Self {
            rules,
            selection: Selection::None,
            last_link_ms: None,
            user_id,
            seed,
            transport,
            pending: Vec::new(),
            stats: SyncStats::default(),
            disposed: false,
        }
    }

    pub fn rules(&self) -> LinkRules {
        self.rules
    }

    pub fn set_rules(&mut self, rules: LinkRules) {
        self.rules = rules;
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn clear_selection(&mut self) {
        self.selection = Selection::None;
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    pub fn pending_syncs(&self) -> usize {
        self.pending.len()
    }

    /// Toggle selection, select, or attempt a link with the current selection.
    /// The selection is cleared after any link attempt.
    pub fn select_or_link(
        &mut self,
        id: NodeId,
        now_ms: f64,
        nodes: &mut NodeLayer,
        out: &mut Vec<LinkEvent>,
    ) -> SelectOutcome {
        match self.selection {
            Selection::Selected(sel) if sel == id => {
                self.selection = Selection::None;
                SelectOutcome::Deselected
            }
            Selection::None => {
                self.selection = Selection::Selected(id);
                SelectOutcome::Selected(id)
            }
            Selection::Selected(sel) => {
                self.selection = Selection::None;
                match self.try_link(sel, id, now_ms, nodes, out) {
                    Ok(()) => SelectOutcome::Linked { from: sel, to: id },
                    Err(e) => SelectOutcome::Rejected(e),
                }
            }
        }
    }

    /// Validate cooldown, existence, then distance; apply on success.
    pub fn try_link(
        &mut self,
        a: NodeId,
        b: NodeId,
        now_ms: f64,
        nodes: &mut NodeLayer,
        out: &mut Vec<LinkEvent>,
    ) -> Result<(), LinkRejected> {
        let result = self.validate(a, b, now_ms, nodes);
        let (theme, intensity) = match result {
            Ok(v) => v,
            Err(e) => {
                log::debug!("[link] rejected {} -> {}: {}", a, b, e);
                return Err(e);
            }
        };

        nodes.link(a);
        nodes.link(b);
        self.last_link_ms = Some(now_ms);
        out.push(LinkEvent::Created {
            from: a,
            to: b,
            theme,
        });
        log::info!("[link] created {} -> {} theme={}", a, b, theme);

        if !self.disposed {
            let request = UpsertLink {
                user_id: self.user_id.clone(),
                seed: self.seed,
                node_a: a.0,
                node_b: b.0,
                theme,
                intensity,
            };
            let future = self.transport.upsert_link(request);
            self.pending.push(PendingSync {
                theme,
                from: a,
                to: b,
                future,
            });
            self.stats.issued += 1;
        }
        Ok(())
    }

    fn validate(
        &self,
        a: NodeId,
        b: NodeId,
        now_ms: f64,
        nodes: &NodeLayer,
    ) -> Result<(Theme, f32), LinkRejected> {
        if let Some(last) = self.last_link_ms {
            let elapsed = now_ms - last;
            if elapsed < self.rules.cooldown_ms {
                return Err(LinkRejected::Cooldown {
                    remaining_ms: self.rules.cooldown_ms - elapsed,
                });
            }
        }
        let na = nodes.get(a).ok_or(LinkRejected::UnknownNode(a))?;
        let nb = nodes.get(b).ok_or(LinkRejected::UnknownNode(b))?;
        if a == b {
            return Err(LinkRejected::SameNode(a));
        }
        let distance = na.position.distance(nb.position);
        if distance > self.rules.max_link_distance {
            return Err(LinkRejected::TooFar {
                distance,
                max: self.rules.max_link_distance,
            });
        }
        let intensity = if na.theme == nb.theme {
            SHARED_THEME_INTENSITY
        } else {
            BASE_LINK_INTENSITY
        };
        Ok((na.theme, intensity))
    }

    /// Poll outstanding syncs once without blocking. Acknowledged milestones
    /// are pushed as [`LinkEvent::Evolve`]. Does nothing after `dispose`.
    pub fn poll(&mut self, out: &mut Vec<LinkEvent>) {
        if self.disposed || self.pending.is_empty() {
            return;
        }
        let mut cx = Context::from_waker(noop_waker_ref());
        let stats = &mut self.stats;
        self.pending.retain_mut(|p| match p.future.as_mut().poll(&mut cx) {
            Poll::Pending => true,
            Poll::Ready(Ok(reply)) => {
                stats.acknowledged += 1;
                log::debug!(
                    "[link] synced {} -> {} total={} theme_links={}",
                    p.from,
                    p.to,
                    reply.total_links,
                    reply.theme_links
                );
                if reply.milestone_added {
                    out.push(LinkEvent::Evolve {
                        theme: p.theme,
                        level: reply.milestone_level,
                        theme_links: reply.theme_links,
                    });
                }
                false
            }
            Poll::Ready(Err(e)) => {
                stats.failed += 1;
                log::warn!("[link] sync failed for {} -> {}: {}", p.from, p.to, e);
                false
            }
        });
    }

    /// Drop outstanding futures; completions that arrive later are ignored.
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.pending.clear();
        self.selection = Selection::None;
    }
}
