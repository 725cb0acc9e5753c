use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

pub const INPUT_FILE: &str = "lammps.in";
pub const INITIAL_DATA_FILE: &str = "initial.data";
pub const FINAL_DATA_FILE: &str = "final.data";
pub const LOG_FILE: &str = "log.lammps";

/// Thermo columns requested from every stage so the log can be parsed uniformly.
pub const THERMO_STYLE: &str = "custom step temp pe ke etotal press vol lx ly lz";

/// One `keyword args...` line of a LAMMPS script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LammpsCommand {
    pub keyword: &'static str,
    pub args: String,
}

impl LammpsCommand {
    pub fn new(keyword: &'static str, args: impl Into<String>) -> Self {
        Self {
            keyword,
            args: args.into(),
        }
    }
}

/// A `lammps.in` script for one stage.
///
/// Commands are rendered in a fixed order regardless of how they were added:
/// system setup, potential, groups, velocities, fixes, output, run, and the
/// closing `write_data`. LAMMPS needs groups before the fixes that use them and
/// every fix and dump before `run`.
#[derive(Debug, Clone, PartialEq)]
pub struct InputDeck {
    pub units: String,
    pub atom_style: String,
    pub boundary: String,
    pub data_file: String,
    pub potential: Vec<String>,
    pub groups: Vec<String>,
    pub velocities: Vec<String>,
    pub fixes: Vec<String>,
    pub thermo_style: String,
    pub thermo_interval: u64,
    pub dumps: Vec<String>,
    pub run_steps: u64,
    pub final_data_file: String,
}

impl InputDeck {
    pub fn new(run_steps: u64) -> Self {
        Self {
            units: "metal".to_string(),
            atom_style: "full".to_string(),
            boundary: "p p p".to_string(),
            data_file: INITIAL_DATA_FILE.to_string(),
            potential: Vec::new(),
            groups: Vec::new(),
            velocities: Vec::new(),
            fixes: Vec::new(),
            thermo_style: THERMO_STYLE.to_string(),
            thermo_interval: 100,
            dumps: Vec::new(),
            run_steps,
            final_data_file: FINAL_DATA_FILE.to_string(),
        }
    }

    /// Routes a command to its slot by keyword. Potential commands are passed whole.
    pub fn push(&mut self, command: LammpsCommand) {
        let LammpsCommand { keyword, args } = command;
        match keyword {
            "group" => self.groups.push(args),
            "velocity" => self.velocities.push(args),
            "fix" => self.fixes.push(args),
            "dump" => self.dumps.push(args),
            "thermo" => {
                if let Ok(interval) = args.trim().parse() {
                    self.thermo_interval = interval;
                }
            }
            other => self.potential.push(format!("{} {}", other, args)),
        }
    }

    pub fn with(mut self, command: LammpsCommand) -> Self {
        self.push(command);
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut line = |s: String| {
            // Writing to a String cannot fail.
            let _ = writeln!(out, "{}", s);
        };

        line(format!("units {}", self.units));
        line(format!("atom_style {}", self.atom_style));
        line(format!("boundary {}", self.boundary));
        line(format!("read_data {}", self.data_file));
        line(String::new());
        for cmd in &self.potential {
            line(cmd.clone());
        }
        line(String::new());
        for g in &self.groups {
            line(format!("group {}", g));
        }
        for v in &self.velocities {
            line(format!("velocity {}", v));
        }
        for f in &self.fixes {
            line(format!("fix {}", f));
        }
        line(String::new());
        line(format!("thermo_style {}", self.thermo_style));
        line(format!("thermo {}", self.thermo_interval));
        for d in &self.dumps {
            line(format!("dump {}", d));
        }
        line(String::new());
        line(format!("run {}", self.run_steps));
        line(format!("write_data {}", self.final_data_file));
        out
    }

    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        fs::write(path, self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_rendered_in_dependency_order() {
        let deck = InputDeck::new(20000)
            .with(LammpsCommand::new(
                "dump",
                "DUMP all custom 10000 mol.lammpstrj id type x y z",
            ))
            .with(LammpsCommand::new("fix", "1 liquid/group nvt temp 10 10 100.0"))
            .with(LammpsCommand::new("group", "solid/group id <= 4"))
            .with(LammpsCommand::new("pair_style", "lj/cut 2.5"));
        let text = deck.render();

        let pos = |needle: &str| text.find(needle).unwrap_or_else(|| panic!("{needle} missing"));
        assert!(pos("read_data initial.data") < pos("pair_style lj/cut 2.5"));
        assert!(pos("pair_style") < pos("group solid/group"));
        assert!(pos("group solid/group") < pos("fix 1 liquid/group"));
        assert!(pos("fix 1") < pos("dump DUMP"));
        assert!(pos("dump DUMP") < pos("run 20000"));
        assert!(pos("run 20000") < pos("write_data final.data"));
    }

    #[test]
    fn thermo_interval_is_parsed_from_its_command() {
        let deck = InputDeck::new(10).with(LammpsCommand::new("thermo", "250"));
        assert_eq!(deck.thermo_interval, 250);
        assert!(deck.render().contains("thermo 250\n"));
        assert!(deck.render().contains(&format!("thermo_style {}", THERMO_STYLE)));
    }

    #[test]
    fn write_to_path_creates_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(INPUT_FILE);
        InputDeck::new(5).write_to_path(&path).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.starts_with("units metal\natom_style full\n"));
    }
}
