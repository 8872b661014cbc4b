use std::collections::{HashSet, VecDeque};
use std::ops::Range;
use std::sync::Arc;

use tracing::{debug, error, info};

use dietrack_core::{AuditRecord, BitVector, TrackerDefinition, UpdateMode, ValueSource};
use dietrack_store::{AuditSink, DefinitionRepo, DefinitionStore, StoreError};

use crate::error::EngineError;
use crate::policy::DownBinPolicy;
use crate::resolver::{GlobalVariables, VariableResolver};

/// Parameters for one composite update. `log` defaults to true; a record is
/// then written for every attempt, including no-ops and rejections.
pub struct UpdateParams<'a> {
    value: BitVector,
    mask: Option<&'a BitVector>,
    result_for_log: Option<&'a BitVector>,
    mode: UpdateMode,
    log: bool,
}

impl<'a> UpdateParams<'a> {
    pub fn new(value: BitVector, mode: UpdateMode) -> Self {
        Self {
            value,
            mask: None,
            result_for_log: None,
            mode,
            log: true,
        }
    }

    /// Withhold bits from the update: a `1` in the mask preserves the stored
    /// bit regardless of the incoming value or mode.
    pub fn with_mask(mut self, mask: &'a BitVector) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Override the `result` field of the audit record. The stored outcome
    /// is unaffected.
    pub fn with_result_for_log(mut self, result: &'a BitVector) -> Self {
        self.result_for_log = Some(result);
        self
    }

    pub fn without_log(mut self) -> Self {
        self.log = false;
        self
    }
}

/// Outcome of one non-cascading update step.
enum Applied {
    Committed { before: BitVector, after: BitVector },
    Unchanged,
    Rejected,
}

/// Operations over a composite tracker: one or more named trackers addressed
/// together as a single concatenated bit vector.
///
/// An engine instance is constructed fresh for each logical operation and
/// holds no tracker state of its own; every read and write goes through the
/// injected store. Construction fails fast if any constituent name has no
/// definition.
pub struct TrackingEngine {
    names: Vec<String>,
    defs: Vec<TrackerDefinition>,
    repo: DefinitionRepo,
    audit: Arc<dyn AuditSink>,
    resolver: VariableResolver,
    policy: DownBinPolicy,
}

impl std::fmt::Debug for TrackingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingEngine")
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

impl TrackingEngine {
    pub fn new<I, S>(
        names: I,
        store: Arc<dyn DefinitionStore>,
        audit: Arc<dyn AuditSink>,
        globals: Arc<dyn GlobalVariables>,
    ) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let repo = DefinitionRepo::new(store.clone());
        let mut defs = Vec::with_capacity(names.len());
        for name in &names {
            defs.push(lookup_tracker(&repo, name)?);
        }
        Ok(Self {
            names,
            defs,
            repo,
            audit,
            resolver: VariableResolver::new(store.clone(), globals),
            policy: DownBinPolicy::new(store),
        })
    }

    /// Constituent names joined with `,`; used to tag audit records.
    pub fn name(&self) -> String {
        self.names.join(",")
    }

    pub fn size(&self) -> usize {
        self.defs.iter().map(|d| d.size).sum()
    }

    pub fn constituents(&self) -> &[TrackerDefinition] {
        &self.defs
    }

    /// Concatenated initial values of the constituents, in list order.
    pub fn reset_value(&self) -> BitVector {
        BitVector::concat(self.defs.iter().map(|d| &d.initial_value))
    }

    /// Concatenated stored values. Fails with `NotInitialized` if any
    /// constituent was never written.
    pub fn current_bits(&self) -> Result<BitVector, EngineError> {
        let mut bits = BitVector::default();
        for def in &self.defs {
            match self.repo.tracker_data(&def.name)? {
                Some(value) => bits.extend(&value),
                None => {
                    return Err(EngineError::NotInitialized {
                        tracker: def.name.clone(),
                    })
                }
            }
        }
        Ok(bits)
    }

    /// Resolve a named input and convert it leniently into bits: `1` sets a
    /// bit, any other character clears it.
    pub fn mask_bits(&self, source: ValueSource, name: &str) -> Result<BitVector, EngineError> {
        let raw = self.resolver.resolve(source, name)?;
        Ok(BitVector::from_lenient(&raw))
    }

    /// Apply one update to the composite value, then propagate any resulting
    /// full disables along the link-on-disable graph.
    ///
    /// Returns `Ok(false)` when the update (or a cascaded disable) was
    /// refused by the down-bin policy; state already committed by earlier
    /// steps of the same call is left in place.
    pub fn update(&self, params: UpdateParams<'_>) -> Result<bool, EngineError> {
        match self.apply(&params)? {
            Applied::Rejected => Ok(false),
            Applied::Unchanged => Ok(true),
            Applied::Committed { before, after } => self.cascade(&before, &after),
        }
    }

    /// Convenience overload: resolve the new value from a named input, then
    /// update.
    pub fn update_from_source(
        &self,
        source: ValueSource,
        name: &str,
        mask: Option<&BitVector>,
        mode: UpdateMode,
    ) -> Result<bool, EngineError> {
        let value = self.mask_bits(source, name)?;
        let mut params = UpdateParams::new(value, mode);
        if let Some(mask) = mask {
            params = params.with_mask(mask);
        }
        self.update(params)
    }

    /// Convenience overload: one voltage per bit; a bit is disabled unless
    /// its voltage lies within `[low, high]`.
    pub fn update_from_voltages(
        &self,
        voltages: &[f64],
        low: f64,
        high: f64,
        mode: UpdateMode,
    ) -> Result<bool, EngineError> {
        if voltages.len() != self.size() {
            return Err(EngineError::WidthMismatch {
                expected: self.size(),
                actual: voltages.len(),
            });
        }
        let mut value = BitVector::zeros(voltages.len());
        for (i, v) in voltages.iter().enumerate() {
            value.set(i, !(low <= *v && *v <= high));
        }
        self.update(UpdateParams::new(value, mode))
    }

    /// Write an audit record with the stored value as both incoming and
    /// outgoing, without mutating state.
    pub fn log_only(&self, mask: &BitVector, result: &BitVector) -> Result<(), EngineError> {
        self.check_width(mask)?;
        let current = self.current_bits()?;
        let record = AuditRecord::new(self.name(), mask, result, &current, &current);
        self.audit.append(&record)?;
        Ok(())
    }

    /// One update step without cascade propagation.
    fn apply(&self, params: &UpdateParams<'_>) -> Result<Applied, EngineError> {
        let size = self.size();
        self.check_width(&params.value)?;
        if let Some(mask) = params.mask {
            self.check_width(mask)?;
        }

        // A composite that was never (fully) written reads as all zeros and
        // is always allowed to commit.
        let (current, valid_prior) = match self.current_bits() {
            Ok(bits) => (bits, true),
            Err(EngineError::NotInitialized { .. }) => (BitVector::zeros(size), false),
            Err(e) => return Err(e),
        };

        let default_mask = BitVector::zeros(size);
        let mask = params.mask.unwrap_or(&default_mask);

        let mut next = BitVector::zeros(size);
        for i in 0..size {
            let bit = if mask.get(i) {
                current.get(i)
            } else {
                params.value.get(i) || (current.get(i) && params.mode == UpdateMode::Merge)
            };
            next.set(i, bit);
        }

        if params.log {
            let result = params.result_for_log.unwrap_or(&params.value);
            let record = AuditRecord::new(self.name(), mask, result, &current, &next);
            self.audit.append(&record)?;
        }

        if valid_prior {
            if next == current {
                debug!(tracker = %self.name(), value = %current, "update is a no-op");
                return Ok(Applied::Unchanged);
            }
            if !self.policy.allowed()? {
                error!(
                    tracker = %self.name(),
                    current = %current,
                    requested = %next,
                    "down-bin rejected: tracker data may not change after commit"
                );
                return Ok(Applied::Rejected);
            }
        }

        for (def, range) in self.defs.iter().zip(self.slice_ranges()) {
            self.repo.set_tracker_data(&def.name, &next.slice(range))?;
        }
        info!(tracker = %self.name(), before = %current, after = %next, "tracker updated");

        Ok(Applied::Committed { before: current, after: next })
    }

    /// Breadth-first propagation of link-on-disable, with a visited set
    /// global to this top-level call so cyclic link graphs terminate.
    fn cascade(&self, before: &BitVector, after: &BitVector) -> Result<bool, EngineError> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        seed_links(&self.defs, &self.slice_ranges(), before, after, &mut visited, &mut queue);

        while let Some(name) = queue.pop_front() {
            if !visited.insert(name.clone()) {
                debug!(tracker = %name, "cascade target already handled in this call");
                continue;
            }

            let linked = self.sub_engine(&name)?;
            let already_disabled = matches!(
                linked.current_bits(),
                Ok(bits) if bits.is_all_ones()
            );
            if already_disabled {
                debug!(tracker = %name, "linked tracker already fully disabled");
                continue;
            }

            let all_ones = BitVector::ones(linked.size());
            match linked.apply(&UpdateParams::new(all_ones, UpdateMode::Overwrite))? {
                Applied::Rejected => {
                    error!(tracker = %name, "cascade disable rejected; update failed");
                    return Ok(false);
                }
                Applied::Unchanged => {}
                Applied::Committed { before, after } => {
                    seed_links(
                        &linked.defs,
                        &linked.slice_ranges(),
                        &before,
                        &after,
                        &mut visited,
                        &mut queue,
                    );
                }
            }
        }
        Ok(true)
    }

    /// Engine over a single linked tracker, sharing this engine's
    /// collaborators.
    fn sub_engine(&self, name: &str) -> Result<TrackingEngine, EngineError> {
        let def = lookup_tracker(&self.repo, name)?;
        Ok(TrackingEngine {
            names: vec![name.to_string()],
            defs: vec![def],
            repo: self.repo.clone(),
            audit: self.audit.clone(),
            resolver: self.resolver.clone(),
            policy: self.policy.clone(),
        })
    }

    /// Bit range each constituent occupies within the composite, in order.
    fn slice_ranges(&self) -> Vec<Range<usize>> {
        let mut ranges = Vec::with_capacity(self.defs.len());
        let mut offset = 0;
        for def in &self.defs {
            ranges.push(offset..offset + def.size);
            offset += def.size;
        }
        ranges
    }

    fn check_width(&self, bits: &BitVector) -> Result<(), EngineError> {
        if bits.len() != self.size() {
            return Err(EngineError::WidthMismatch {
                expected: self.size(),
                actual: bits.len(),
            });
        }
        Ok(())
    }
}

fn lookup_tracker(repo: &DefinitionRepo, name: &str) -> Result<TrackerDefinition, EngineError> {
    repo.get_tracker(name).map_err(|e| match e {
        StoreError::NotFound(_) => EngineError::UnknownTracker(name.to_string()),
        other => EngineError::Store(other),
    })
}

/// Queue the links of every constituent whose slice just transitioned to
/// fully disabled. The constituent itself joins the visited set: a cycle
/// leading back to it is skipped without another store read.
fn seed_links(
    defs: &[TrackerDefinition],
    ranges: &[Range<usize>],
    before: &BitVector,
    after: &BitVector,
    visited: &mut HashSet<String>,
    queue: &mut VecDeque<String>,
) {
    for (def, range) in defs.iter().zip(ranges) {
        let was_disabled = before.slice(range.clone()).is_all_ones();
        let now_disabled = after.slice(range.clone()).is_all_ones();
        if !was_disabled && now_disabled {
            visited.insert(def.name.clone());
            for target in &def.link_on_disable {
                debug!(tracker = %def.name, target = %target, "queueing link-on-disable");
                queue.push_back(target.clone());
            }
        }
    }
}
