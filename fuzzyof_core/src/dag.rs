//! DAG-scoped views the engine reads and writes.
//!
//! The DODAG lifecycle (joining, trickle, neighbor table) lives outside this
//! crate; `Dag` only carries the fields the objective function needs, and
//! parents are reached through `ParentRef` handles borrowed from their `Dag`.

use std::ops::Deref;

use crate::container::{MetricContainer, MetricObject};
use crate::link_stats::LinkStats;
use crate::types::{LinkAddr, Rank};

/// A neighbor as seen from one DAG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parent {
    pub addr: LinkAddr,
    /// Rank the neighbor advertised.
    pub rank: Rank,
    pub link: LinkStats,
    /// Last metric object the neighbor advertised.
    pub mc: MetricObject,
}

impl Parent {
    pub fn new(addr: LinkAddr, rank: Rank) -> Self {
        Self {
            addr,
            rank,
            link: LinkStats::default(),
            mc: MetricObject::default(),
        }
    }

    pub fn with_metrics(mut self, mc: MetricObject) -> Self {
        self.mc = mc;
        self
    }

    pub fn with_link(mut self, link: LinkStats) -> Self {
        self.link = link;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Dag {
    pub rank: Rank,
    pub grounded: bool,
    pub preference: u8,
    pub joined: bool,
    min_hoprankinc: u16,
    preferred_parent: Option<LinkAddr>,
    parents: Vec<Parent>,
}

impl Dag {
    /// Unjoined DAG at infinite rank.
    pub fn new(min_hoprankinc: u16) -> Self {
        Self {
            rank: Rank::INFINITE,
            grounded: false,
            preference: 0,
            joined: false,
            min_hoprankinc: min_hoprankinc.max(1),
            preferred_parent: None,
            parents: Vec::new(),
        }
    }

    /// Joined, grounded DAG rooted at this node.
    pub fn root(min_hoprankinc: u16) -> Self {
        let mut dag = Self::new(min_hoprankinc);
        dag.rank = dag.root_rank();
        dag.grounded = true;
        dag.joined = true;
        dag
    }

    #[inline]
    pub fn min_hoprankinc(&self) -> u16 {
        self.min_hoprankinc
    }

    #[inline]
    pub fn root_rank(&self) -> Rank {
        Rank(self.min_hoprankinc)
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.rank == self.root_rank()
    }

    /// Insert or replace the parent with `parent.addr`.
    pub fn add_parent(&mut self, parent: Parent) -> &mut Parent {
        let idx = match self.parents.iter().position(|p| p.addr == parent.addr) {
            Some(i) => {
                self.parents[i] = parent;
                i
            }
            None => {
                self.parents.push(parent);
                self.parents.len() - 1
            }
        };
        &mut self.parents[idx]
    }

    /// Remove a parent; clears the preferred parent if it was that one.
    pub fn remove_parent(&mut self, addr: LinkAddr) -> Option<Parent> {
        let idx = self.parents.iter().position(|p| p.addr == addr)?;
        if self.preferred_parent == Some(addr) {
            self.preferred_parent = None;
        }
        Some(self.parents.remove(idx))
    }

    pub fn parent(&self, addr: LinkAddr) -> Option<ParentRef<'_>> {
        self.parents
            .iter()
            .find(|p| p.addr == addr)
            .map(|parent| ParentRef { dag: self, parent })
    }

    /// Two members of this DAG, ready to be compared. `None` if either is unknown.
    pub fn pair(&self, first: LinkAddr, second: LinkAddr) -> Option<ParentPair<'_>> {
        Some(ParentPair {
            first: self.parent(first)?,
            second: self.parent(second)?,
        })
    }

    pub fn parent_mut(&mut self, addr: LinkAddr) -> Option<&mut Parent> {
        self.parents.iter_mut().find(|p| p.addr == addr)
    }

    pub fn parents(&self) -> impl Iterator<Item = ParentRef<'_>> + '_ {
        self.parents.iter().map(move |parent| ParentRef { dag: self, parent })
    }

    pub fn parent_count(&self) -> usize {
        self.parents.len()
    }

    pub fn preferred_parent(&self) -> Option<ParentRef<'_>> {
        self.preferred_parent.and_then(|a| self.parent(a))
    }

    /// Point the preferred parent at a member of this DAG, or clear it.
    /// Returns `false` (and changes nothing) for an unknown address.
    pub fn set_preferred_parent(&mut self, addr: Option<LinkAddr>) -> bool {
        match addr {
            Some(a) if self.parent(a).is_none() => false,
            _ => {
                self.preferred_parent = addr;
                true
            }
        }
    }
}

/// A parent together with the DAG it belongs to.
#[derive(Clone, Copy)]
pub struct ParentRef<'d> {
    dag: &'d Dag,
    parent: &'d Parent,
}

impl<'d> ParentRef<'d> {
    #[inline]
    pub fn dag(&self) -> &'d Dag {
        self.dag
    }

    #[inline]
    pub fn parent(&self) -> &'d Parent {
        self.parent
    }

    #[inline]
    pub fn is_preferred(&self) -> bool {
        self.dag.preferred_parent == Some(self.parent.addr)
    }

    #[inline]
    pub fn same_dag(&self, other: &ParentRef<'_>) -> bool {
        std::ptr::eq(self.dag, other.dag)
    }
}

impl Deref for ParentRef<'_> {
    type Target = Parent;

    fn deref(&self) -> &Parent {
        self.parent
    }
}

impl core::fmt::Debug for ParentRef<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ParentRef")
            .field("addr", &self.parent.addr)
            .field("rank", &self.parent.rank)
            .field("preferred", &self.is_preferred())
            .finish()
    }
}

/// Two parents of the same DAG. Only `Dag::pair` (and the parent fold in
/// `ObjectiveFunction::select_parent`) can build one.
#[derive(Debug, Clone, Copy)]
pub struct ParentPair<'d> {
    first: ParentRef<'d>,
    second: ParentRef<'d>,
}

impl<'d> ParentPair<'d> {
    /// Both handles must come from the same `Dag`.
    pub(crate) fn from_same_dag(first: ParentRef<'d>, second: ParentRef<'d>) -> Self {
        Self { first, second }
    }

    #[inline]
    pub fn first(&self) -> ParentRef<'d> {
        self.first
    }

    #[inline]
    pub fn second(&self) -> ParentRef<'d> {
        self.second
    }
}

/// One RPL instance: the current DAG and the container advertised for it.
#[derive(Debug, Clone)]
pub struct Instance {
    dag: Dag,
    container: MetricContainer,
}

impl Instance {
    pub fn new(dag: Dag) -> Self {
        Self {
            dag,
            container: MetricContainer::default(),
        }
    }

    pub fn dag(&self) -> &Dag {
        &self.dag
    }

    pub fn dag_mut(&mut self) -> &mut Dag {
        &mut self.dag
    }

    pub fn container(&self) -> &MetricContainer {
        &self.container
    }

    pub(crate) fn container_mut(&mut self) -> &mut MetricContainer {
        &mut self.container
    }
}
