//! Adapter for a three-axis DMC-style ASCII motion controller.
//!
//! Axis A carries X, B carries Y and C carries polarization. Positions and
//! rates travel over the wire in encoder counts; this adapter converts to and
//! from millimetres and degrees.

use scanner_traits::{Axis, BoxError, MotionController, MotorStatus, Position, Transport};

use crate::error::{HwError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DmcScale {
    pub counts_per_mm: f64,
    pub counts_per_deg: f64,
}

impl Default for DmcScale {
    fn default() -> Self {
        Self {
            counts_per_mm: 1000.0,
            counts_per_deg: 100.0,
        }
    }
}

pub struct DmcController<T: Transport> {
    transport: T,
    scale: DmcScale,
    trigger_interval_mm: f64,
}

impl<T: Transport> DmcController<T> {
    /// Wrap an already connected transport.
    pub fn new(transport: T, scale: DmcScale) -> Self {
        Self {
            transport,
            scale,
            trigger_interval_mm: 1.0,
        }
    }

    /// Open the link and wrap it.
    pub fn connect(mut transport: T, scale: DmcScale) -> Result<Self> {
        transport.connect().map_err(HwError::from_boxed)?;
        Ok(Self::new(transport, scale))
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    fn mm(&self, value: f64) -> i64 {
        (value * self.scale.counts_per_mm).round() as i64
    }

    fn deg(&self, value: f64) -> i64 {
        (value * self.scale.counts_per_deg).round() as i64
    }

    fn command(&mut self, command: &str) -> Result<String> {
        tracing::debug!(command, "dmc command");
        let reply = self
            .transport
            .query(command)
            .map_err(HwError::from_boxed)?;
        if reply.starts_with('?') {
            return Err(HwError::Rejected(command.to_string()));
        }
        Ok(reply)
    }

    /// Issue `command` and parse exactly `n` numbers from the reply.
    fn numbers(&mut self, command: &str, n: usize) -> Result<Vec<f64>> {
        let reply = self.command(command)?;
        let bad = || HwError::BadReply {
            command: command.to_string(),
            reply: reply.clone(),
        };
        let values = reply
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|tok| !tok.is_empty())
            .map(|tok| tok.parse::<f64>().map_err(|_| bad()))
            .collect::<Result<Vec<_>>>()?;
        if values.len() != n {
            return Err(bad());
        }
        Ok(values)
    }

    fn flags(&mut self, command: &str) -> Result<[bool; 3]> {
        let v = self.numbers(command, 3)?;
        Ok([v[0] != 0.0, v[1] != 0.0, v[2] != 0.0])
    }

    fn set_xy_rate(&mut self, op: &str, mm_per_s: f64) -> Result<()> {
        let c = self.mm(mm_per_s);
        self.command(&format!("{op} {c},{c}"))?;
        Ok(())
    }

    fn set_pol_rate(&mut self, op: &str, deg_per_s: f64) -> Result<()> {
        let c = self.deg(deg_per_s);
        self.command(&format!("{op} ,,{c}"))?;
        Ok(())
    }
}

impl<T: Transport> MotionController for DmcController<T> {
    fn is_connected(&mut self) -> bool {
        self.transport.is_alive()
    }

    fn set_xy_speed(&mut self, mm_per_s: f64) -> std::result::Result<(), BoxError> {
        Ok(self.set_xy_rate("SP", mm_per_s)?)
    }

    fn set_pol_speed(&mut self, deg_per_s: f64) -> std::result::Result<(), BoxError> {
        Ok(self.set_pol_rate("SP", deg_per_s)?)
    }

    fn set_xy_accel(&mut self, mm_per_s2: f64) -> std::result::Result<(), BoxError> {
        Ok(self.set_xy_rate("AC", mm_per_s2)?)
    }

    fn set_xy_decel(&mut self, mm_per_s2: f64) -> std::result::Result<(), BoxError> {
        Ok(self.set_xy_rate("DC", mm_per_s2)?)
    }

    fn set_pol_accel(&mut self, deg_per_s2: f64) -> std::result::Result<(), BoxError> {
        Ok(self.set_pol_rate("AC", deg_per_s2)?)
    }

    fn set_pol_decel(&mut self, deg_per_s2: f64) -> std::result::Result<(), BoxError> {
        Ok(self.set_pol_rate("DC", deg_per_s2)?)
    }

    fn pol_torque(&mut self) -> std::result::Result<f64, BoxError> {
        Ok(self.numbers("TTC", 1)?[0])
    }

    fn motor_status(&mut self) -> std::result::Result<MotorStatus, BoxError> {
        // _MOx is 1 when the amplifier is off; _BGx is 1 while profiling
        let off = self.flags("MG _MOA,_MOB,_MOC")?;
        let moving = self.flags("MG _BGA,_BGB,_BGC")?;
        let torque = self.numbers("TTC", 1)?[0];
        Ok(MotorStatus {
            x_power: !off[0],
            y_power: !off[1],
            pol_power: !off[2],
            x_motion: moving[0],
            y_motion: moving[1],
            pol_motion: moving[2],
            pol_torque: Some(torque),
        })
    }

    fn read_position(&mut self) -> std::result::Result<Position, BoxError> {
        let c = self.numbers("TP ABC", 3)?;
        Ok(Position {
            x: c[0] / self.scale.counts_per_mm,
            y: c[1] / self.scale.counts_per_mm,
            pol: c[2] / self.scale.counts_per_deg,
        })
    }

    fn set_zero(&mut self, axis: Axis) -> std::result::Result<(), BoxError> {
        let cmd = match axis {
            Axis::X => "DP 0",
            Axis::Y => "DP ,0",
            Axis::Pol => "DP ,,0",
            Axis::Xy => "DP 0,0",
        };
        self.command(cmd)?;
        Ok(())
    }

    fn set_trigger_interval(&mut self, interval_mm: f64) -> std::result::Result<(), BoxError> {
        self.trigger_interval_mm = interval_mm;
        Ok(())
    }

    fn begin_move(&mut self, target: Position, with_trigger: bool) -> std::result::Result<(), BoxError> {
        let (a, b, c) = (self.mm(target.x), self.mm(target.y), self.deg(target.pol));
        self.command(&format!("PA {a},{b},{c}"))?;
        if with_trigger {
            let spacing = self.mm(self.trigger_interval_mm);
            self.command(&format!("TI {spacing}"))?;
        }
        self.command("BG ABC")?;
        Ok(())
    }

    fn halt(&mut self) -> std::result::Result<(), BoxError> {
        self.command("ST ABC")?;
        Ok(())
    }

    fn quantize(&self, target: &Position) -> Position {
        Position {
            x: self.mm(target.x) as f64 / self.scale.counts_per_mm,
            y: self.mm(target.y) as f64 / self.scale.counts_per_mm,
            pol: self.deg(target.pol) as f64 / self.scale.counts_per_deg,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays canned replies and records every request.
    #[derive(Default)]
    struct Scripted {
        replies: VecDeque<String>,
        sent: Vec<String>,
    }

    impl Scripted {
        fn with(replies: &[&str]) -> Self {
            Self {
                replies: replies.iter().map(|r| r.to_string()).collect(),
                sent: Vec::new(),
            }
        }
    }

    impl Transport for Scripted {
        fn connect(&mut self) -> std::result::Result<(), BoxError> {
            Ok(())
        }
        fn disconnect(&mut self) -> std::result::Result<(), BoxError> {
            Ok(())
        }
        fn query(&mut self, request: &str) -> std::result::Result<String, BoxError> {
            self.sent.push(request.to_string());
            self.replies
                .pop_front()
                .ok_or_else(|| Box::new(HwError::Timeout) as BoxError)
        }
        fn is_alive(&mut self) -> bool {
            true
        }
    }

    fn dmc(replies: &[&str]) -> DmcController<Scripted> {
        DmcController::new(Scripted::with(replies), DmcScale::default())
    }

    #[test]
    fn position_is_scaled_from_counts() {
        let mut c = dmc(&["145000, 20500, -10000"]);
        let p = c.read_position().unwrap();
        assert_eq!(p, Position::new(145.0, 20.5, -100.0));
        assert_eq!(c.into_transport().sent, vec!["TP ABC"]);
    }

    #[test]
    fn triggered_move_sends_target_spacing_and_begin() {
        let mut c = dmc(&["", "", ""]);
        c.set_trigger_interval(0.5).unwrap();
        c.begin_move(Position::new(1.0, 2.0, -3.5), true).unwrap();
        assert_eq!(
            c.into_transport().sent,
            vec!["PA 1000,2000,-350", "TI 500", "BG ABC"]
        );
    }

    #[test]
    fn motor_flags_map_to_status() {
        let mut c = dmc(&["0 1 0", "1.0000 0.0000 0.0000", "-0.42"]);
        let st = c.motor_status().unwrap();
        assert!(st.power_fail());
        assert!(st.x_motion && !st.y_motion);
        assert_eq!(st.pol_torque, Some(-0.42));
    }

    #[test]
    fn targets_snap_to_whole_counts() {
        let c = dmc(&[]);
        let q = c.quantize(&Position::new(1.0004, -2.0006, 45.126));
        assert_eq!(q, Position::new(1.0, -2.001, 45.13));
        // the snapped pose is exactly what a count readback reports
        assert_eq!(c.quantize(&q), q);
    }

    #[test]
    fn rejection_is_typed() {
        let mut c = dmc(&["?"]);
        let err = c.halt().unwrap_err();
        match HwError::from_boxed(err) {
            HwError::Rejected(cmd) => assert_eq!(cmd, "ST ABC"),
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn short_reply_is_bad_reply() {
        let mut c = dmc(&["1, 2"]);
        let err = c.read_position().unwrap_err();
        match HwError::from_boxed(err) {
            HwError::BadReply { command, .. } => assert_eq!(command, "TP ABC"),
            other => panic!("expected BadReply, got {other:?}"),
        }
    }
}
