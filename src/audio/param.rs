use crate::foundation::error::{ReelError, ReelResult};

#[derive(Clone, Copy, Debug, PartialEq)]
enum EventKind {
    SetValue,
    LinearRamp,
    ExponentialRamp,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct AutomationEvent {
    kind: EventKind,
    time: f64,
    value: f32,
}

/// A gain value driven by a time-sorted automation event list.
///
/// Times are absolute clock seconds. Events at equal times keep insertion order; a value holds
/// until the next event, and a ramp interpolates from the event before it (or from the default
/// value at `t = 0` when it is first).
#[derive(Clone, Debug, PartialEq)]
pub struct AudioParam {
    default_value: f32,
    events: Vec<AutomationEvent>,
}

impl AudioParam {
    pub fn new(default_value: f32) -> Self {
        Self {
            default_value,
            events: Vec::new(),
        }
    }

    pub fn default_value(&self) -> f32 {
        self.default_value
    }

    /// Number of scheduled automation events.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64) -> ReelResult<()> {
        self.insert(EventKind::SetValue, value, time)
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, time: f64) -> ReelResult<()> {
        self.insert(EventKind::LinearRamp, value, time)
    }

    pub fn exponential_ramp_to_value_at_time(&mut self, value: f32, time: f64) -> ReelResult<()> {
        self.insert(EventKind::ExponentialRamp, value, time)
    }

    fn insert(&mut self, kind: EventKind, value: f32, time: f64) -> ReelResult<()> {
        if !value.is_finite() {
            return Err(ReelError::validation(format!(
                "automation value must be finite, got {value}"
            )));
        }
        if !time.is_finite() {
            return Err(ReelError::validation(format!(
                "automation time must be finite, got {time}"
            )));
        }
        let at = self.events.partition_point(|e| e.time <= time);
        self.events.insert(at, AutomationEvent { kind, time, value });
        Ok(())
    }

    /// Value of the parameter at absolute time `t`.
    pub fn value_at(&self, t: f64) -> f32 {
        let next = self.events.partition_point(|e| e.time <= t);
        if let Some(ev) = self.events.get(next)
            && ev.kind != EventKind::SetValue
        {
            let (t0, v0) = match next.checked_sub(1) {
                Some(prev) => (self.events[prev].time, self.events[prev].value),
                None => (0.0, self.default_value),
            };
            if t >= t0 {
                return interpolate(ev.kind, t0, v0, ev.time, ev.value, t);
            }
        }
        match next.checked_sub(1) {
            Some(prev) => self.events[prev].value,
            None => self.default_value,
        }
    }

    /// Fill `out[i]` with the value at `start + i * step`.
    pub fn fill_values(&self, start: f64, step: f64, out: &mut [f32]) {
        if self.events.is_empty() {
            out.fill(self.default_value);
            return;
        }
        for (i, v) in out.iter_mut().enumerate() {
            *v = self.value_at(start + (i as f64) * step);
        }
    }
}

fn interpolate(kind: EventKind, t0: f64, v0: f32, t1: f64, v1: f32, t: f64) -> f32 {
    if t1 <= t0 {
        return v1;
    }
    let frac = ((t - t0) / (t1 - t0)).clamp(0.0, 1.0);
    match kind {
        EventKind::SetValue => v0,
        EventKind::LinearRamp => v0 + (v1 - v0) * frac as f32,
        EventKind::ExponentialRamp => {
            if v0 == 0.0 || v1 == 0.0 || (v0 < 0.0) != (v1 < 0.0) {
                return v0;
            }
            let ratio = f64::from(v1) / f64::from(v0);
            (f64::from(v0) * ratio.powf(frac)) as f32
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/param.rs"]
mod tests;
