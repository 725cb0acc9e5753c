use super::config::WorkflowConfig;
use crate::core::io::input_deck::{InputDeck, LammpsCommand};
use crate::core::models::species::Species;
use crate::core::potential::ForceFieldError;
use rand::Rng;
use serde::Serialize;

const SOLID_GROUP: &str = "solid/group";
const LIQUID_GROUP: &str = "liquid/group";
const TRAJECTORY_FILE: &str = "mol.lammpstrj";
const MAX_VELOCITY_SEED: u32 = 10_000_000;

/// The four stages of a coexistence run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    /// NPT: bring the whole solid to the melting-point guess.
    Heat,
    /// NVT on the liquid half at a multiple of the guess; the solid half is frozen.
    Melt,
    /// NPT on the liquid half back to the guess, barostatted along x only.
    Cool,
    /// NPH on everything; the system drifts to the coexistence temperature.
    Equilibrate,
}

impl StageKind {
    pub const ALL: [StageKind; 4] = [
        StageKind::Heat,
        StageKind::Melt,
        StageKind::Cool,
        StageKind::Equilibrate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Heat => "heat",
            StageKind::Melt => "melt",
            StageKind::Cool => "cool",
            StageKind::Equilibrate => "equilibrate",
        }
    }

    pub fn directory(&self) -> &'static str {
        match self {
            StageKind::Heat => "step_a",
            StageKind::Melt => "step_b",
            StageKind::Cool => "step_c",
            StageKind::Equilibrate => "step_d",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StageKind::Heat => "Step A: heating solid (NPT)",
            StageKind::Melt => "Step B: melting liquid half (NVT)",
            StageKind::Cool => "Step C: cooling liquid half (NPT, x only)",
            StageKind::Equilibrate => "Step D: equilibrating interface (NPH)",
        }
    }

    pub fn steps(&self, config: &WorkflowConfig) -> u64 {
        match self {
            StageKind::Heat => config.steps.heat,
            StageKind::Melt => config.steps.melt,
            StageKind::Cool => config.steps.cool,
            StageKind::Equilibrate => config.steps.equilibrate,
        }
    }

    /// Whether the stage starts from velocities left by the previous stage.
    pub fn inherits_velocities(&self) -> bool {
        !matches!(self, StageKind::Heat)
    }
}

/// Draws a `velocity create` seed. LAMMPS rejects a seed of zero.
pub fn velocity_seed(rng: &mut impl Rng) -> u32 {
    rng.gen_range(1..=MAX_VELOCITY_SEED)
}

/// Builds the input deck for one stage.
///
/// `num_atoms` is the size of the sorted initial structure; ids up to half of
/// it form the solid group in the melt and cool stages.
pub fn build_deck(
    kind: StageKind,
    config: &WorkflowConfig,
    species: &[Species],
    num_atoms: usize,
    rng: &mut impl Rng,
) -> Result<InputDeck, ForceFieldError> {
    let t = config.melting_point_guess;
    let thermo = &config.thermostat;
    let hot = t * thermo.melt_factor;
    let p = thermo.pressure;

    let mut deck = InputDeck::new(kind.steps(config));
    deck.potential = config.force_field.commands(species)?;

    let commands: Vec<LammpsCommand> = match kind {
        StageKind::Heat => vec![
            LammpsCommand::new("velocity", format!("all create {:.3} {}", t, velocity_seed(rng))),
            LammpsCommand::new(
                "fix",
                format!(
                    "1 all npt temp {t:.3} {t:.3} {:.1} iso {p:.1} {p:.1} {:.1}",
                    thermo.temp_damp, thermo.press_damp
                ),
            ),
        ],
        StageKind::Melt => {
            let mut cmds = split_groups(num_atoms);
            cmds.push(LammpsCommand::new(
                "velocity",
                format!("{} create {:.3} {}", LIQUID_GROUP, hot, velocity_seed(rng)),
            ));
            cmds.push(LammpsCommand::new(
                "fix",
                format!(
                    "1 {} nvt temp {hot:.3} {hot:.3} {:.1}",
                    LIQUID_GROUP, thermo.temp_damp
                ),
            ));
            cmds
        }
        StageKind::Cool => {
            let mut cmds = split_groups(num_atoms);
            cmds.push(LammpsCommand::new(
                "velocity",
                format!("{} create {:.3} {}", LIQUID_GROUP, t, velocity_seed(rng)),
            ));
            cmds.push(LammpsCommand::new(
                "fix",
                format!(
                    "1 {} npt temp {t:.3} {t:.3} {:.1} x {p:.1} {p:.1} {:.1}",
                    LIQUID_GROUP, thermo.temp_damp, thermo.press_damp
                ),
            ));
            cmds
        }
        StageKind::Equilibrate => vec![LammpsCommand::new(
            "fix",
            format!("1 all nph x {p:.1} {p:.1} {:.1}", thermo.press_damp),
        )],
    };

    for command in commands {
        deck.push(command);
    }
    deck.push(LammpsCommand::new(
        "dump",
        format!(
            "DUMP all custom {} {} id type x y z vx vy vz mol",
            config.output.dump_interval, TRAJECTORY_FILE
        ),
    ));
    deck.push(LammpsCommand::new(
        "thermo",
        config.output.thermo_interval.to_string(),
    ));
    Ok(deck)
}

fn split_groups(num_atoms: usize) -> Vec<LammpsCommand> {
    vec![
        LammpsCommand::new("group", format!("{} id <= {}", SOLID_GROUP, num_atoms / 2)),
        LammpsCommand::new(
            "group",
            format!("{} subtract all {}", LIQUID_GROUP, SOLID_GROUP),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::tests::mgo_builder;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::path::PathBuf;

    fn render(kind: StageKind) -> String {
        let config = mgo_builder(PathBuf::from("runs")).build().unwrap();
        let species = config.crystal.species();
        let mut rng = StdRng::seed_from_u64(7);
        build_deck(kind, &config, &species, 2000, &mut rng)
            .unwrap()
            .render()
    }

    #[test]
    fn stage_directories_follow_execution_order() {
        let dirs: Vec<_> = StageKind::ALL.iter().map(|s| s.directory()).collect();
        assert_eq!(dirs, vec!["step_a", "step_b", "step_c", "step_d"]);
        assert!(!StageKind::Heat.inherits_velocities());
        assert!(StageKind::Equilibrate.inherits_velocities());
    }

    #[test]
    fn heat_stage_barostats_isotropically_at_the_guess() {
        let deck = render(StageKind::Heat);
        assert!(deck.contains("fix 1 all npt temp 3010.000 3010.000 100.0 iso 0.0 0.0 1000.0\n"));
        assert!(deck.contains("velocity all create 3010.000 "));
        assert!(deck.contains("run 20000\n"));
        assert!(!deck.contains("group"));
    }

    #[test]
    fn melt_stage_freezes_the_solid_half_and_doubles_the_temperature() {
        let deck = render(StageKind::Melt);
        assert!(deck.contains("group solid/group id <= 1000\n"));
        assert!(deck.contains("group liquid/group subtract all solid/group\n"));
        assert!(deck.contains("velocity liquid/group create 6020.000 "));
        assert!(deck.contains("fix 1 liquid/group nvt temp 6020.000 6020.000 100.0\n"));
    }

    #[test]
    fn cool_stage_barostats_along_x_only() {
        let deck = render(StageKind::Cool);
        assert!(deck.contains(
            "fix 1 liquid/group npt temp 3010.000 3010.000 100.0 x 0.0 0.0 1000.0\n"
        ));
        assert!(deck.contains("velocity liquid/group create 3010.000 "));
    }

    #[test]
    fn equilibrate_stage_runs_nph_on_everything() {
        let deck = render(StageKind::Equilibrate);
        assert!(deck.contains("fix 1 all nph x 0.0 0.0 1000.0\n"));
        assert!(deck.contains("run 30000\n"));
        assert!(!deck.contains("velocity"));
    }

    #[test]
    fn every_stage_dumps_and_carries_the_potential() {
        for kind in StageKind::ALL {
            let deck = render(kind);
            assert!(deck.contains(
                "dump DUMP all custom 10000 mol.lammpstrj id type x y z vx vy vz mol\n"
            ));
            assert!(deck.contains("thermo 100\n"));
            assert!(deck.contains("pair_style buck/coul/long 10.0\n"));
            assert!(deck.contains("kspace_style pppm 1.0e-5\n"));
            assert!(deck.contains("pair_coeff 1 2 9892.357"));
        }
    }

    #[test]
    fn velocity_seeds_are_never_zero() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..10_000 {
            let seed = velocity_seed(&mut rng);
            assert!((1..=MAX_VELOCITY_SEED).contains(&seed));
        }
    }
}
