//! Controller statistics collection and reporting.
//!
//! This module tracks what the controller did over a run. It provides:
//! 1. **Cycles:** Total cycles and cycles spent in the power-up sequence.
//! 2. **Command mix:** Counts per command kind.
//! 3. **Refresh:** Forced vs opportunistic refreshes and the deepest backlog observed.
//! 4. **Traffic:** Read/write grants and request admission latency.

use std::time::Instant;

use serde::Serialize;

use crate::controller::command::Command;
use crate::controller::fsm::RefreshKind;

/// Controller statistics.
#[derive(Clone, Debug, Serialize)]
pub struct ControllerStats {
    #[serde(skip)]
    start_time: Instant,
    /// Total controller cycles elapsed.
    pub cycles: u64,
    /// Cycles before the controller first reached idle.
    pub init_cycles: u64,

    /// Commands issued, indexed like [`Command::ALL`].
    pub commands: [u64; Command::ALL.len()],

    /// REFRESH commands issued during initialization.
    pub refresh_init: u64,
    /// REFRESH commands that pre-empted traffic because the backlog was full.
    pub refresh_forced: u64,
    /// REFRESH commands slipped in while no request was waiting.
    pub refresh_opportunistic: u64,
    /// Highest outstanding refresh backlog observed.
    pub max_backlog: u32,

    /// Transactions latched from the request interface.
    pub admissions: u64,
    /// Write grants (one per transaction).
    pub write_grants: u64,
    /// Read grants (one per transaction).
    pub read_grants: u64,
    /// Sum of cycles requests waited between strobe and admission.
    pub admission_latency_total: u64,
    /// Longest wait between strobe and admission.
    pub admission_latency_max: u64,
}

impl Default for ControllerStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            cycles: 0,
            init_cycles: 0,
            commands: [0; Command::ALL.len()],
            refresh_init: 0,
            refresh_forced: 0,
            refresh_opportunistic: 0,
            max_backlog: 0,
            admissions: 0,
            write_grants: 0,
            read_grants: 0,
            admission_latency_total: 0,
            admission_latency_max: 0,
        }
    }
}

impl ControllerStats {
    /// Counts one issued command.
    pub fn record_command(&mut self, cmd: Command) {
        if let Some(i) = Command::ALL.iter().position(|&c| c == cmd) {
            self.commands[i] += 1;
        }
    }

    /// Counts one REFRESH by cause.
    pub const fn record_refresh(&mut self, kind: RefreshKind) {
        match kind {
            RefreshKind::Init => self.refresh_init += 1,
            RefreshKind::Forced => self.refresh_forced += 1,
            RefreshKind::Opportunistic => self.refresh_opportunistic += 1,
        }
    }

    /// Counts one admission that waited `latency` cycles.
    pub fn record_admission(&mut self, latency: u64) {
        self.admissions += 1;
        self.admission_latency_total += latency;
        self.admission_latency_max = self.admission_latency_max.max(latency);
    }

    /// Number of times `cmd` was issued.
    pub fn command_count(&self, cmd: Command) -> u64 {
        Command::ALL
            .iter()
            .position(|&c| c == cmd)
            .map_or(0, |i| self.commands[i])
    }

    /// Mean cycles between request strobe and admission.
    pub fn avg_admission_latency(&self) -> f64 {
        if self.admissions == 0 {
            0.0
        } else {
            self.admission_latency_total as f64 / self.admissions as f64
        }
    }

    /// Prints selected sections of the report.
    ///
    /// Valid names: `summary`, `commands`, `refresh`, `traffic`. An empty slice prints
    /// everything.
    pub fn print_sections(&self, sections: &[String]) {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let seconds = self.start_time.elapsed().as_secs_f64();
        let cyc = self.cycles.max(1);

        if want("summary") {
            let khz = (self.cycles as f64 / seconds) / 1000.0;
            println!("\n==========================================================");
            println!("SDRAM CONTROLLER STATISTICS");
            println!("==========================================================");
            println!("host_seconds             {seconds:.4} s");
            println!("sim_cycles               {}", self.cycles);
            println!("sim_freq                 {khz:.2} kHz");
            println!("init_cycles              {}", self.init_cycles);
            println!("----------------------------------------------------------");
        }
        if want("commands") {
            println!("COMMANDS");
            for (cmd, count) in Command::ALL.iter().zip(self.commands) {
                if count != 0 {
                    println!(
                        "  {:<22} {} ({:.2}%)",
                        cmd.mnemonic(),
                        count,
                        (count as f64 / cyc as f64) * 100.0
                    );
                }
            }
            println!("----------------------------------------------------------");
        }
        if want("refresh") {
            println!("REFRESH");
            println!("  refresh.init           {}", self.refresh_init);
            println!("  refresh.forced         {}", self.refresh_forced);
            println!("  refresh.opportunistic  {}", self.refresh_opportunistic);
            println!("  backlog.max            {}", self.max_backlog);
            println!("----------------------------------------------------------");
        }
        if want("traffic") {
            println!("TRAFFIC");
            println!("  admissions             {}", self.admissions);
            println!("  grants.read            {}", self.read_grants);
            println!("  grants.write           {}", self.write_grants);
            println!("  latency.avg            {:.2}", self.avg_admission_latency());
            println!("  latency.max            {}", self.admission_latency_max);
            println!("==========================================================");
        }
    }

    /// Prints the full report.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}
