//! Max-priority heap ordering and three-way lane partition for the
//! Executor's due set.

use std::collections::BinaryHeap;
use tempo_core::model::Schedule;

/// Wraps a `Schedule` so a `BinaryHeap` (a max-heap in std) orders by
/// descending `priority`. Heap stability on ties is not guaranteed.
struct ByPriority(Schedule);

impl PartialEq for ByPriority {
    fn eq(&self, other: &Self) -> bool {
        self.0.priority == other.0.priority
    }
}
impl Eq for ByPriority {}
impl PartialOrd for ByPriority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ByPriority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.priority.cmp(&other.0.priority)
    }
}

/// A due set partitioned into the three dispatch lanes, in descending
/// priority order within each lane.
pub struct Lanes {
    pub high: Vec<Schedule>,
    pub mid: Vec<Schedule>,
    pub low: Vec<Schedule>,
}

/// Builds a max-heap over `due` keyed by priority, drains it into a
/// descending-priority slice `J`, then splits `J` into three contiguous
/// bands of `floor(|J| / 3)` each with the remainder tailing into Low.
/// `|J| < 3` routes everything to Low; `|J| == 0` yields three empty lanes.
pub fn partition(due: Vec<Schedule>) -> Lanes {
    let mut heap: BinaryHeap<ByPriority> = due.into_iter().map(ByPriority).collect();
    let mut sorted = Vec::with_capacity(heap.len());
    while let Some(ByPriority(s)) = heap.pop() {
        sorted.push(s);
    }

    let total = sorted.len();
    if total < 3 {
        return Lanes {
            high: Vec::new(),
            mid: Vec::new(),
            low: sorted,
        };
    }

    let band = total / 3;
    let mut remaining = sorted;
    let low = remaining.split_off(2 * band);
    let mid = remaining.split_off(band);
    let high = remaining;

    Lanes { high, mid, low }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn schedule(priority: i32) -> Schedule {
        let now = Utc::now();
        Schedule {
            job_id: format!("job-{priority}"),
            priority,
            payload: "scripts/a.py".into(),
            max_retries: 0,
            retry_count: 0,
            exec_time: None,
            duration_ms: None,
            rcre_time: now,
            next_run_time: now,
            last_run_time: None,
        }
    }

    #[test]
    fn six_schedules_split_evenly_two_per_lane() {
        let due = vec![90, 80, 70, 60, 50, 40].into_iter().map(schedule).collect();
        let lanes = partition(due);
        assert_eq!(lanes.high.iter().map(|s| s.priority).collect::<Vec<_>>(), vec![90, 80]);
        assert_eq!(lanes.mid.iter().map(|s| s.priority).collect::<Vec<_>>(), vec![70, 60]);
        assert_eq!(lanes.low.iter().map(|s| s.priority).collect::<Vec<_>>(), vec![50, 40]);
    }

    #[test]
    fn seven_schedules_tail_the_remainder_into_low() {
        let due = vec![90, 80, 70, 60, 50, 40, 30].into_iter().map(schedule).collect();
        let lanes = partition(due);
        assert_eq!(lanes.high.iter().map(|s| s.priority).collect::<Vec<_>>(), vec![90, 80]);
        assert_eq!(lanes.mid.iter().map(|s| s.priority).collect::<Vec<_>>(), vec![70, 60]);
        assert_eq!(lanes.low.iter().map(|s| s.priority).collect::<Vec<_>>(), vec![50, 40, 30]);
    }

    #[test]
    fn fewer_than_three_all_go_to_low() {
        let due = vec![90, 80].into_iter().map(schedule).collect();
        let lanes = partition(due);
        assert!(lanes.high.is_empty());
        assert!(lanes.mid.is_empty());
        assert_eq!(lanes.low.len(), 2);
    }

    #[test]
    fn empty_due_set_yields_empty_lanes() {
        let lanes = partition(Vec::new());
        assert!(lanes.high.is_empty() && lanes.mid.is_empty() && lanes.low.is_empty());
    }
}
