// =============================================================================
// Crossover & Run-Length Primitives
// =============================================================================
//
//   cross(a, b)[i]         = a[i] > b[i] && a[i-1] <= b[i-1]     (false at 0)
//   bars_since(e)[i]       = 0 on event days, prev + 1 after the first event,
//                            0 before any event has occurred
//   bars_since_nth(e, n)[i]= distance from i back to the n-th most recent
//                            event at or before i, 0 if fewer than n events
//
// All outputs are aligned with their inputs and row i reads rows <= i only.
// =============================================================================

/// Upward crossing of `a` over `b`.
pub fn cross(a: &[f64], b: &[f64]) -> Vec<bool> {
    let n = a.len().min(b.len());
    (0..n)
        .map(|i| i > 0 && a[i] > b[i] && a[i - 1] <= b[i - 1])
        .collect()
}

/// Number of rows since the most recent event, see module docs.
pub fn bars_since(events: &[bool]) -> Vec<usize> {
    let mut out = Vec::with_capacity(events.len());
    let mut count = 0usize;
    let mut seen = false;
    for &e in events {
        if e {
            count = 0;
            seen = true;
        } else if seen {
            count += 1;
        }
        out.push(count);
    }
    out
}

/// Distance to the `n`-th most recent event (n = 1 is the latest).
pub fn bars_since_nth(events: &[bool], n: usize) -> Vec<usize> {
    let mut positions: Vec<usize> = Vec::new();
    let mut out = Vec::with_capacity(events.len());
    for (i, &e) in events.iter().enumerate() {
        if e {
            positions.push(i);
        }
        let d = if n > 0 && positions.len() >= n {
            i - positions[positions.len() - n]
        } else {
            0
        };
        out.push(d);
    }
    out
}

/// Running count of events seen at or before each row.
pub fn event_count(events: &[bool]) -> Vec<usize> {
    events
        .iter()
        .scan(0usize, |acc, &e| {
            *acc += e as usize;
            Some(*acc)
        })
        .collect()
}

/// Number of events within the trailing `window` rows ending at i.
/// Rows with fewer than `window` rows of history report `None`.
pub fn rolling_count(events: &[bool], window: usize) -> Vec<Option<usize>> {
    let counts = event_count(events);
    (0..events.len())
        .map(|i| {
            if window == 0 || i + 1 < window {
                None
            } else if i + 1 == window {
                Some(counts[i])
            } else {
                Some(counts[i] - counts[i - window])
            }
        })
        .collect()
}
