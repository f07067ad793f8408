//! Process registry.
//!
//! Owns every registered descriptor together with its statistics. The
//! kernel rebuilds its execution queue from here every epoch, so
//! registrations and removals take effect at the next `run()`.

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::errors::ValidationError;
use crate::domain::models::{
    CategoryIntervals, FrequencyCategory, Priority, Process, ProcessDescriptor, ProcessStats,
    ScheduleRule,
};

/// A descriptor after validation, with its statistics.
pub struct RegisteredProcess {
    pub id: String,
    pub name: String,
    pub priority: Priority,
    pub frequency: FrequencyCategory,
    pub rule: ScheduleRule,
    /// Registration order, used as the tie-break when ranking.
    pub seq: u64,
    pub stats: ProcessStats,
    pub(crate) process: Box<dyn Process>,
}

impl RegisteredProcess {
    pub fn view(&self) -> ProcessView {
        ProcessView {
            id: self.id.clone(),
            name: self.name.clone(),
            priority: self.priority,
            frequency: self.frequency,
            schedule: self.rule,
            stats: self.stats.clone(),
        }
    }
}

/// Read-only copy of a registered process handed to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessView {
    pub id: String,
    pub name: String,
    pub priority: Priority,
    pub frequency: FrequencyCategory,
    pub schedule: ScheduleRule,
    pub stats: ProcessStats,
}

/// Table of registered processes keyed by id.
pub struct ProcessRegistry {
    entries: HashMap<String, RegisteredProcess>,
    intervals: CategoryIntervals,
    default_frequency: FrequencyCategory,
    next_seq: u64,
}

impl ProcessRegistry {
    pub fn new(intervals: CategoryIntervals, default_frequency: FrequencyCategory) -> Self {
        Self {
            entries: HashMap::new(),
            intervals,
            default_frequency,
            next_seq: 0,
        }
    }

    /// Validate and add a descriptor.
    pub fn register(&mut self, descriptor: ProcessDescriptor) -> Result<(), ValidationError> {
        if descriptor.id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if self.entries.contains_key(&descriptor.id) {
            return Err(ValidationError::DuplicateId(descriptor.id));
        }

        let frequency = descriptor.frequency.unwrap_or(self.default_frequency);
        let rule = self.resolve_rule(&descriptor, frequency)?;

        let seq = self.next_seq;
        self.next_seq += 1;

        let ProcessDescriptor {
            id,
            name,
            priority,
            execute,
            ..
        } = descriptor;

        self.entries.insert(
            id.clone(),
            RegisteredProcess {
                id,
                name,
                priority,
                frequency,
                rule,
                seq,
                stats: ProcessStats::default(),
                process: execute,
            },
        );
        Ok(())
    }

    fn resolve_rule(
        &self,
        descriptor: &ProcessDescriptor,
        frequency: FrequencyCategory,
    ) -> Result<ScheduleRule, ValidationError> {
        let id = &descriptor.id;

        if descriptor.tick_modulo.is_some() || descriptor.tick_offset.is_some() {
            if descriptor.interval.is_some() {
                return Err(ValidationError::ConflictingSchedule(id.clone()));
            }

            let modulo = descriptor.tick_modulo.unwrap_or(0);
            if modulo <= 0 {
                return Err(ValidationError::InvalidTickModulo {
                    id: id.clone(),
                    modulo,
                });
            }

            let offset = descriptor.tick_offset.unwrap_or(0);
            if offset < 0 || offset >= modulo {
                return Err(ValidationError::InvalidTickOffset {
                    id: id.clone(),
                    offset,
                    modulo,
                });
            }

            return Ok(ScheduleRule::Modulo {
                modulo: modulo.unsigned_abs(),
                offset: offset.unsigned_abs(),
            });
        }

        match descriptor.interval {
            Some(0) => Err(ValidationError::ZeroInterval(id.clone())),
            Some(every) => Ok(ScheduleRule::Interval { every }),
            None => Ok(ScheduleRule::Interval {
                every: self.intervals.get(frequency).max(1),
            }),
        }
    }

    /// Remove a process and its statistics.
    pub fn unregister(&mut self, id: &str) -> bool {
        self.entries.remove(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&RegisteredProcess> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut RegisteredProcess> {
        self.entries.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// All processes in registration order.
    pub fn list(&self) -> Vec<&RegisteredProcess> {
        let mut entries: Vec<&RegisteredProcess> = self.entries.values().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries
    }

    /// All processes in registration order, mutably.
    pub fn list_mut(&mut self) -> Vec<&mut RegisteredProcess> {
        let mut entries: Vec<&mut RegisteredProcess> = self.entries.values_mut().collect();
        entries.sort_by_key(|entry| entry.seq);
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
