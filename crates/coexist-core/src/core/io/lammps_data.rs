use super::traits::SimulatorFile;
use crate::core::elements::{self, ElementError};
use crate::core::models::lattice::Lattice;
use crate::core::models::species::Species;
use crate::core::models::structure::{Site, Structure, wrap_unit};
use nalgebra::{Matrix3, Point3, Vector3};
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use thiserror::Error;

const TILT_TOLERANCE: f64 = 1e-8;
const DEFAULT_TITLE: &str = "LAMMPS data file written by coexist";

#[derive(Debug, Error)]
pub enum LammpsDataError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Missing required header: {0}")]
    MissingHeader(&'static str),
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
    #[error(transparent)]
    Element(#[from] ElementError),
    #[error("Structure has sites without velocities, cannot write a Velocities section")]
    MissingVelocities,
    #[error("Atom type {atom_type} has no species (only {known} species provided)")]
    UnknownAtomType { atom_type: usize, known: usize },
}

/// Which per-atom fields to take from the structure when building a data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataOptions {
    pub include_charge: bool,
    pub include_velocities: bool,
}

impl Default for DataOptions {
    fn default() -> Self {
        Self {
            include_charge: true,
            include_velocities: false,
        }
    }
}

/// Simulation box in LAMMPS restricted triclinic form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LammpsBox {
    pub lo: Vector3<f64>,
    pub hi: Vector3<f64>,
    /// `xy xz yz` tilt factors; `None` for orthogonal boxes.
    pub tilt: Option<[f64; 3]>,
}

impl LammpsBox {
    /// Re-expresses a lattice with `a` along x and `b` in the xy plane.
    pub fn from_lattice(lattice: &Lattice) -> Self {
        let (a, b, c) = (lattice.vector(0), lattice.vector(1), lattice.vector(2));
        let lx = a.norm();
        let a_hat = a / lx;
        let xy = b.dot(&a_hat);
        let ly = (b.norm_squared() - xy * xy).max(0.0).sqrt();
        let xz = c.dot(&a_hat);
        let yz = (b.dot(&c) - xy * xz) / ly;
        let lz = (c.norm_squared() - xz * xz - yz * yz).max(0.0).sqrt();

        let tilt = [xy, xz, yz];
        Self {
            lo: Vector3::zeros(),
            hi: Vector3::new(lx, ly, lz),
            tilt: tilt
                .iter()
                .any(|t| t.abs() > TILT_TOLERANCE)
                .then_some(tilt),
        }
    }

    pub fn lattice(&self) -> Lattice {
        let l = self.hi - self.lo;
        let [xy, xz, yz] = self.tilt.unwrap_or([0.0; 3]);
        Lattice::from_vectors(
            Vector3::new(l.x, 0.0, 0.0),
            Vector3::new(xy, l.y, 0.0),
            Vector3::new(xz, yz, l.z),
        )
    }
}

/// One line of an `Atoms # full` section.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomRecord {
    pub id: usize,
    pub molecule: usize,
    pub atom_type: usize,
    pub charge: f64,
    pub position: Point3<f64>,
    pub image: Option<[i32; 3]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AtomStyle {
    Full,
    Charge,
    Atomic,
}

impl AtomStyle {
    fn from_hint(hint: &str) -> Self {
        match hint.trim() {
            "charge" => AtomStyle::Charge,
            "atomic" => AtomStyle::Atomic,
            _ => AtomStyle::Full,
        }
    }
}

/// A LAMMPS data file using `atom_style full`.
///
/// Atoms are kept sorted by id. When present, `velocities[i]` belongs to `atoms[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LammpsData {
    pub title: String,
    pub simulation_box: LammpsBox,
    /// Mass of each atom type; index 0 is type 1.
    pub masses: Vec<f64>,
    pub atoms: Vec<AtomRecord>,
    pub velocities: Option<Vec<Vector3<f64>>>,
}

impl LammpsData {
    /// Converts a structure into a data file.
    ///
    /// Species become atom types in table order, sites become atoms with ids
    /// `1..=N` in site order. Positions and velocities are rotated into the
    /// LAMMPS frame when the lattice is not already in restricted form.
    pub fn from_structure(
        structure: &Structure,
        options: DataOptions,
    ) -> Result<Self, LammpsDataError> {
        if options.include_velocities && !structure.has_velocities() {
            return Err(LammpsDataError::MissingVelocities);
        }

        let masses = structure
            .species()
            .iter()
            .map(|s| elements::atomic_mass(&s.symbol))
            .collect::<Result<Vec<_>, _>>()?;

        let simulation_box = LammpsBox::from_lattice(structure.lattice());
        let box_lattice = simulation_box.lattice();
        let rotation = frame_rotation(structure.lattice(), &box_lattice);

        let atoms = structure
            .sites()
            .iter()
            .enumerate()
            .map(|(i, site)| {
                let frac = structure.lattice().to_fractional(&site.position);
                AtomRecord {
                    id: i + 1,
                    molecule: 1,
                    atom_type: site.species_index + 1,
                    charge: if options.include_charge {
                        structure.species_of(site).oxidation_state
                    } else {
                        0.0
                    },
                    position: box_lattice.to_cartesian(&frac) + simulation_box.lo,
                    image: None,
                }
            })
            .collect();

        let velocities = options.include_velocities.then(|| {
            structure
                .sites()
                .iter()
                .map(|s| rotation * s.velocity.unwrap_or_else(Vector3::zeros))
                .collect()
        });

        Ok(Self {
            title: DEFAULT_TITLE.to_string(),
            simulation_box,
            masses,
            atoms,
            velocities,
        })
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn num_atom_types(&self) -> usize {
        self.masses.len()
    }

    /// Rebuilds a structure, mapping atom type `t` to `species_by_type[t - 1]`.
    ///
    /// Atom id order becomes site order and positions are wrapped into the cell.
    pub fn to_structure(&self, species_by_type: &[Species]) -> Result<Structure, LammpsDataError> {
        let lattice = self.simulation_box.lattice();
        let mut sites = Vec::with_capacity(self.atoms.len());

        for (i, atom) in self.atoms.iter().enumerate() {
            if atom.atom_type == 0 || atom.atom_type > species_by_type.len() {
                return Err(LammpsDataError::UnknownAtomType {
                    atom_type: atom.atom_type,
                    known: species_by_type.len(),
                });
            }
            let relative = atom.position - self.simulation_box.lo;
            let frac = lattice.to_fractional(&relative).map(wrap_unit);
            let mut site = Site::new(atom.atom_type - 1, lattice.to_cartesian(&frac));
            if let Some(velocities) = &self.velocities {
                site = site.with_velocity(velocities[i]);
            }
            sites.push(site);
        }

        Ok(Structure::new(lattice, species_by_type.to_vec(), sites))
    }
}

/// Maps vectors in the frame of `from` onto the frame of `to` (same fractional coordinates).
fn frame_rotation(from: &Lattice, to: &Lattice) -> Matrix3<f64> {
    match from.matrix().transpose().try_inverse() {
        Some(inv) => to.matrix().transpose() * inv,
        None => Matrix3::identity(),
    }
}

impl SimulatorFile for LammpsData {
    type Error = LammpsDataError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self, Self::Error> {
        let mut parser = DataParser::default();
        for (idx, line) in reader.lines().enumerate() {
            parser.feed(idx + 1, &line?)?;
        }
        parser.finish()
    }

    fn write_to(&self, writer: &mut impl Write) -> Result<(), Self::Error> {
        let b = &self.simulation_box;
        writeln!(writer, "{}", self.title)?;
        writeln!(writer)?;
        writeln!(writer, "{} atoms", self.atoms.len())?;
        writeln!(writer, "{} atom types", self.masses.len())?;
        writeln!(writer)?;
        writeln!(writer, "{:.10} {:.10} xlo xhi", b.lo.x, b.hi.x)?;
        writeln!(writer, "{:.10} {:.10} ylo yhi", b.lo.y, b.hi.y)?;
        writeln!(writer, "{:.10} {:.10} zlo zhi", b.lo.z, b.hi.z)?;
        if let Some([xy, xz, yz]) = b.tilt {
            writeln!(writer, "{:.10} {:.10} {:.10} xy xz yz", xy, xz, yz)?;
        }

        writeln!(writer)?;
        writeln!(writer, "Masses")?;
        writeln!(writer)?;
        for (i, mass) in self.masses.iter().enumerate() {
            writeln!(writer, "{} {}", i + 1, mass)?;
        }

        writeln!(writer)?;
        writeln!(writer, "Atoms # full")?;
        writeln!(writer)?;
        for atom in &self.atoms {
            write!(
                writer,
                "{} {} {} {:.6} {:.8} {:.8} {:.8}",
                atom.id,
                atom.molecule,
                atom.atom_type,
                atom.charge,
                atom.position.x,
                atom.position.y,
                atom.position.z
            )?;
            if let Some([ix, iy, iz]) = atom.image {
                write!(writer, " {} {} {}", ix, iy, iz)?;
            }
            writeln!(writer)?;
        }

        if let Some(velocities) = &self.velocities {
            writeln!(writer)?;
            writeln!(writer, "Velocities")?;
            writeln!(writer)?;
            for (atom, v) in self.atoms.iter().zip(velocities) {
                writeln!(writer, "{} {:.8} {:.8} {:.8}", atom.id, v.x, v.y, v.z)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Masses,
    Atoms(AtomStyle),
    Velocities,
    Skipped,
}

struct DataParser {
    title: Option<String>,
    section: Section,
    num_atoms: Option<usize>,
    num_types: Option<usize>,
    bounds: [Option<(f64, f64)>; 3],
    tilt: Option<[f64; 3]>,
    masses: HashMap<usize, f64>,
    atoms: Vec<AtomRecord>,
    velocities: HashMap<usize, Vector3<f64>>,
}

impl Default for DataParser {
    fn default() -> Self {
        Self {
            title: None,
            section: Section::Header,
            num_atoms: None,
            num_types: None,
            bounds: [None; 3],
            tilt: None,
            masses: HashMap::new(),
            atoms: Vec::new(),
            velocities: HashMap::new(),
        }
    }
}

fn parse_err(line: usize, message: impl Into<String>) -> LammpsDataError {
    LammpsDataError::Parse {
        line,
        message: message.into(),
    }
}

fn parse_field<T: std::str::FromStr>(
    line: usize,
    fields: &[&str],
    idx: usize,
    what: &str,
) -> Result<T, LammpsDataError> {
    let raw = fields
        .get(idx)
        .ok_or_else(|| parse_err(line, format!("missing {} (field {})", what, idx + 1)))?;
    raw.parse()
        .map_err(|_| parse_err(line, format!("invalid {} '{}'", what, raw)))
}

impl DataParser {
    fn feed(&mut self, line_num: usize, raw: &str) -> Result<(), LammpsDataError> {
        // The first line is always the title, even if it looks like data.
        if self.title.is_none() {
            self.title = Some(raw.trim().to_string());
            return Ok(());
        }

        let (content, comment) = match raw.split_once('#') {
            Some((c, rest)) => (c.trim(), Some(rest)),
            None => (raw.trim(), None),
        };
        if content.is_empty() {
            return Ok(());
        }

        if content.starts_with(|c: char| c.is_ascii_alphabetic()) {
            self.section = match content {
                "Masses" => Section::Masses,
                "Atoms" => Section::Atoms(AtomStyle::from_hint(comment.unwrap_or(""))),
                "Velocities" => Section::Velocities,
                _ => Section::Skipped,
            };
            return Ok(());
        }

        let fields: Vec<&str> = content.split_whitespace().collect();
        match self.section {
            Section::Header => self.feed_header(line_num, content, &fields),
            Section::Masses => {
                let ty: usize = parse_field(line_num, &fields, 0, "atom type")?;
                let mass: f64 = parse_field(line_num, &fields, 1, "mass")?;
                self.masses.insert(ty, mass);
                Ok(())
            }
            Section::Atoms(style) => {
                let atom = parse_atom(line_num, &fields, style)?;
                self.atoms.push(atom);
                Ok(())
            }
            Section::Velocities => {
                let id: usize = parse_field(line_num, &fields, 0, "atom id")?;
                let v = Vector3::new(
                    parse_field(line_num, &fields, 1, "vx")?,
                    parse_field(line_num, &fields, 2, "vy")?,
                    parse_field(line_num, &fields, 3, "vz")?,
                );
                if self.velocities.insert(id, v).is_some() {
                    return Err(parse_err(line_num, format!("duplicate velocity for atom {}", id)));
                }
                Ok(())
            }
            Section::Skipped => Ok(()),
        }
    }

    fn feed_header(
        &mut self,
        line_num: usize,
        content: &str,
        fields: &[&str],
    ) -> Result<(), LammpsDataError> {
        if content.ends_with("atom types") {
            self.num_types = Some(parse_field(line_num, fields, 0, "atom type count")?);
        } else if content.ends_with("atoms") {
            self.num_atoms = Some(parse_field(line_num, fields, 0, "atom count")?);
        } else if content.ends_with("xy xz yz") {
            self.tilt = Some([
                parse_field(line_num, fields, 0, "xy")?,
                parse_field(line_num, fields, 1, "xz")?,
                parse_field(line_num, fields, 2, "yz")?,
            ]);
        } else {
            for (axis, keyword) in ["xlo xhi", "ylo yhi", "zlo zhi"].iter().enumerate() {
                if content.ends_with(keyword) {
                    self.bounds[axis] = Some((
                        parse_field(line_num, fields, 0, "lower bound")?,
                        parse_field(line_num, fields, 1, "upper bound")?,
                    ));
                }
            }
        }
        // Other header keywords (bonds, angles, extra/...) do not apply to this workflow.
        Ok(())
    }

    fn finish(self) -> Result<LammpsData, LammpsDataError> {
        let [x, y, z] = self.bounds;
        let (xlo, xhi) = x.ok_or(LammpsDataError::MissingHeader("xlo xhi"))?;
        let (ylo, yhi) = y.ok_or(LammpsDataError::MissingHeader("ylo yhi"))?;
        let (zlo, zhi) = z.ok_or(LammpsDataError::MissingHeader("zlo zhi"))?;
        let num_atoms = self.num_atoms.ok_or(LammpsDataError::MissingHeader("atoms"))?;
        let num_types = self
            .num_types
            .ok_or(LammpsDataError::MissingHeader("atom types"))?;

        if self.atoms.len() != num_atoms {
            return Err(LammpsDataError::Inconsistency(format!(
                "header declares {} atoms but Atoms section has {}",
                num_atoms,
                self.atoms.len()
            )));
        }

        let mut masses = Vec::with_capacity(num_types);
        for ty in 1..=num_types {
            let mass = self.masses.get(&ty).copied().ok_or_else(|| {
                LammpsDataError::Inconsistency(format!("no mass for atom type {}", ty))
            })?;
            masses.push(mass);
        }

        let mut atoms = self.atoms;
        atoms.sort_by_key(|a| a.id);
        if let Some(pair) = atoms.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(LammpsDataError::Inconsistency(format!(
                "duplicate atom id {}",
                pair[0].id
            )));
        }
        if let Some(atom) = atoms.iter().find(|a| a.atom_type == 0 || a.atom_type > num_types) {
            return Err(LammpsDataError::Inconsistency(format!(
                "atom {} has type {} outside 1..={}",
                atom.id, atom.atom_type, num_types
            )));
        }

        let velocities = if self.velocities.is_empty() {
            None
        } else {
            let mut ordered = Vec::with_capacity(atoms.len());
            for atom in &atoms {
                let v = self.velocities.get(&atom.id).ok_or_else(|| {
                    LammpsDataError::Inconsistency(format!("no velocity for atom {}", atom.id))
                })?;
                ordered.push(*v);
            }
            if self.velocities.len() != atoms.len() {
                return Err(LammpsDataError::Inconsistency(
                    "Velocities section lists atoms missing from the Atoms section".to_string(),
                ));
            }
            Some(ordered)
        };

        Ok(LammpsData {
            title: self.title.unwrap_or_default(),
            simulation_box: LammpsBox {
                lo: Vector3::new(xlo, ylo, zlo),
                hi: Vector3::new(xhi, yhi, zhi),
                tilt: self.tilt,
            },
            masses,
            atoms,
            velocities,
        })
    }
}

fn parse_atom(line: usize, fields: &[&str], style: AtomStyle) -> Result<AtomRecord, LammpsDataError> {
    let id = parse_field(line, fields, 0, "atom id")?;
    let (molecule, atom_type, charge, xyz_at) = match style {
        AtomStyle::Full => (
            parse_field(line, fields, 1, "molecule id")?,
            parse_field(line, fields, 2, "atom type")?,
            parse_field(line, fields, 3, "charge")?,
            4,
        ),
        AtomStyle::Charge => (
            1,
            parse_field(line, fields, 1, "atom type")?,
            parse_field(line, fields, 2, "charge")?,
            3,
        ),
        AtomStyle::Atomic => (1, parse_field(line, fields, 1, "atom type")?, 0.0, 2),
    };
    let position = Point3::new(
        parse_field(line, fields, xyz_at, "x")?,
        parse_field(line, fields, xyz_at + 1, "y")?,
        parse_field(line, fields, xyz_at + 2, "z")?,
    );
    let image = if fields.len() >= xyz_at + 6 {
        Some([
            parse_field(line, fields, xyz_at + 3, "image flag")?,
            parse_field(line, fields, xyz_at + 4, "image flag")?,
            parse_field(line, fields, xyz_at + 5, "image flag")?,
        ])
    } else {
        None
    };
    Ok(AtomRecord {
        id,
        molecule,
        atom_type,
        charge,
        position,
        image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::crystal::builder::{BasisSite, Centering, build_conventional_cell};
    use std::io::Cursor;

    fn mgo_species() -> Vec<Species> {
        vec![Species::new("Mg", 1.4), Species::new("O", -1.4)]
    }

    fn mgo_cell() -> Structure {
        let species = mgo_species();
        let basis = vec![
            BasisSite::new(species[0].clone(), [0.0, 0.0, 0.0]),
            BasisSite::new(species[1].clone(), [0.5, 0.5, 0.5]),
        ];
        build_conventional_cell(&Lattice::cubic(4.2), Centering::FaceCentered, &basis).unwrap()
    }

    fn write_to_string(data: &LammpsData) -> String {
        let mut buf = Vec::new();
        data.write_to(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    const WRITE_DATA_OUTPUT: &str = "\
LAMMPS data file via write_data, version 2 Aug 2023, timestep = 20000, units = metal

3 atoms
2 atom types
0 bonds
0 bond types

-0.0512 8.4512 xlo xhi
0.0 4.2 ylo yhi
0.0 4.2 zlo zhi

Masses

1 24.305
2 15.999

Pair Coeffs # buck/coul/long

1 1309362.2766468062 0.104 0
2 2145.7345 0.3 30.2222

Atoms # full

3 1 2 -1.4 2.1 2.1 2.1 0 0 0
1 1 1 1.4 0.01 0.02 0.03 0 0 0
2 1 1 1.4 8.6 0.0 0.0 -1 0 0

Velocities

2 0.5 0.0 0.0
1 1.0 2.0 3.0
3 -1.0 0.0 0.0
";

    #[test]
    fn writes_counts_bounds_masses_and_atoms() {
        let data = LammpsData::from_structure(&mgo_cell(), DataOptions::default()).unwrap();
        let text = write_to_string(&data);

        assert!(text.contains("8 atoms\n2 atom types\n"));
        assert!(text.contains("0.0000000000 4.2000000000 xlo xhi"));
        assert!(!text.contains("xy xz yz"));
        assert!(text.contains("Masses\n\n1 24.305\n2 15.999\n"));
        assert!(text.contains("Atoms # full\n\n1 1 1 1.400000 0.00000000 0.00000000 0.00000000\n"));
        assert!(!text.contains("Velocities"));
    }

    #[test]
    fn charges_can_be_omitted() {
        let options = DataOptions {
            include_charge: false,
            include_velocities: false,
        };
        let data = LammpsData::from_structure(&mgo_cell(), options).unwrap();
        assert!(data.atoms.iter().all(|a| a.charge == 0.0));
    }

    #[test]
    fn velocities_require_every_site_to_have_one() {
        let options = DataOptions {
            include_charge: true,
            include_velocities: true,
        };
        let result = LammpsData::from_structure(&mgo_cell(), options);
        assert!(matches!(result, Err(LammpsDataError::MissingVelocities)));
    }

    #[test]
    fn parses_write_data_output_sorted_by_id() {
        let data = LammpsData::read_from(&mut Cursor::new(WRITE_DATA_OUTPUT)).unwrap();

        assert_eq!(data.num_atoms(), 3);
        assert_eq!(data.masses, vec![24.305, 15.999]);
        assert_eq!(data.simulation_box.lo.x, -0.0512);
        assert_eq!(data.simulation_box.tilt, None);

        let ids: Vec<_> = data.atoms.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(data.atoms[2].atom_type, 2);
        assert_eq!(data.atoms[1].image, Some([-1, 0, 0]));

        let velocities = data.velocities.as_ref().unwrap();
        assert_eq!(velocities[0], Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(velocities[1], Vector3::new(0.5, 0.0, 0.0));
    }

    #[test]
    fn to_structure_wraps_positions_and_keeps_velocities() {
        let data = LammpsData::read_from(&mut Cursor::new(WRITE_DATA_OUTPUT)).unwrap();
        let structure = data.to_structure(&mgo_species()).unwrap();

        assert_eq!(structure.len(), 3);
        assert!(structure.has_velocities());
        let x = structure.sites()[1].position.x;
        assert!((x - (8.6 + 0.0512 - 8.5024)).abs() < 1e-9);
        assert_eq!(structure.species_of(&structure.sites()[2]).symbol, "O");
    }

    #[test]
    fn to_structure_rejects_unmapped_types() {
        let data = LammpsData::read_from(&mut Cursor::new(WRITE_DATA_OUTPUT)).unwrap();
        let result = data.to_structure(&mgo_species()[..1]);
        assert!(matches!(
            result,
            Err(LammpsDataError::UnknownAtomType {
                atom_type: 2,
                known: 1
            })
        ));
    }

    #[test]
    fn written_file_reads_back_with_same_atoms() {
        let data = LammpsData::from_structure(&mgo_cell(), DataOptions::default()).unwrap();
        let text = write_to_string(&data);
        let parsed = LammpsData::read_from(&mut Cursor::new(text)).unwrap();
        assert_eq!(parsed.num_atoms(), 8);
        assert_eq!(parsed.num_atom_types(), 2);
        assert!(parsed.velocities.is_none());
        for (a, b) in parsed.atoms.iter().zip(&data.atoms) {
            assert_eq!(a.atom_type, b.atom_type);
            assert!((a.position - b.position).norm() < 1e-7);
        }
    }

    #[test]
    fn triclinic_lattices_emit_tilt_factors() {
        let lattice = Lattice::from_parameters(3.0, 3.0, 3.0, 60.0, 60.0, 60.0);
        let tilted = LammpsBox::from_lattice(&lattice);
        let [xy, xz, yz] = tilted.tilt.unwrap();
        assert!((xy - 1.5).abs() < 1e-9);
        assert!((xz - 1.5).abs() < 1e-9);
        assert!(yz > 0.0);
        let back = tilted.lattice();
        assert!((back.volume() - lattice.volume()).abs() < 1e-9);
    }

    #[test]
    fn hexagonal_cell_writes_and_reads_a_tilt_line() {
        let lattice = Lattice::from_parameters(3.0, 3.0, 5.0, 90.0, 90.0, 120.0);
        let sites = vec![
            Site::new(0, lattice.to_cartesian(&Vector3::new(0.0, 0.0, 0.0))),
            Site::new(1, lattice.to_cartesian(&Vector3::new(1.0 / 3.0, 2.0 / 3.0, 0.5))),
        ];
        let structure = Structure::new(lattice.clone(), mgo_species(), sites);

        let data = LammpsData::from_structure(&structure, DataOptions::default()).unwrap();
        let text = write_to_string(&data);
        assert!(text.contains("-1.5000000000 0.0000000000 0.0000000000 xy xz yz\n"));

        let parsed = LammpsData::read_from(&mut Cursor::new(text)).unwrap();
        let [xy, xz, yz] = parsed.simulation_box.tilt.unwrap();
        assert!((xy + 1.5).abs() < 1e-9);
        assert!(xz.abs() < 1e-9 && yz.abs() < 1e-9);

        let rebuilt = parsed.to_structure(&mgo_species()).unwrap();
        assert!((rebuilt.lattice().volume() - lattice.volume()).abs() < 1e-6);
        for (a, b) in rebuilt.sites().iter().zip(structure.sites()) {
            assert!((a.position - b.position).norm() < 1e-6);
        }
    }

    #[test]
    fn rotated_lattice_rotates_positions_and_velocities_together() {
        // Cubic cell turned 90 degrees about z: a points along +y, b along -x.
        let lattice = Lattice::new(Matrix3::new(
            0.0, 4.0, 0.0, //
            -4.0, 0.0, 0.0, //
            0.0, 0.0, 4.0,
        ));
        let sites = vec![
            Site::new(0, Point3::new(0.0, 1.0, 0.0)).with_velocity(Vector3::new(0.0, 1.0, 0.0)),
            Site::new(1, Point3::origin()).with_velocity(Vector3::new(-2.0, 0.0, 0.0)),
        ];
        let structure = Structure::new(lattice, mgo_species(), sites);
        let options = DataOptions {
            include_charge: true,
            include_velocities: true,
        };

        let data = LammpsData::from_structure(&structure, options).unwrap();

        assert_eq!(data.simulation_box.tilt, None);
        assert!((data.atoms[0].position - Point3::new(1.0, 0.0, 0.0)).norm() < 1e-9);
        let velocities = data.velocities.as_ref().unwrap();
        assert!((velocities[0] - Vector3::new(1.0, 0.0, 0.0)).norm() < 1e-9);
        assert!((velocities[1] - Vector3::new(0.0, 2.0, 0.0)).norm() < 1e-9);
    }

    #[test]
    fn atom_count_mismatch_is_inconsistent() {
        let text = WRITE_DATA_OUTPUT.replace("3 atoms", "4 atoms");
        let result = LammpsData::read_from(&mut Cursor::new(text));
        assert!(matches!(result, Err(LammpsDataError::Inconsistency(_))));
    }

    #[test]
    fn missing_box_bounds_are_reported() {
        let text = WRITE_DATA_OUTPUT.replace("0.0 4.2 zlo zhi\n", "");
        let result = LammpsData::read_from(&mut Cursor::new(text));
        assert!(matches!(
            result,
            Err(LammpsDataError::MissingHeader("zlo zhi"))
        ));
    }

    #[test]
    fn bad_numbers_report_line_numbers() {
        let text = WRITE_DATA_OUTPUT.replace("1 1 1 1.4 0.01", "1 1 1 1.4 abc");
        let result = LammpsData::read_from(&mut Cursor::new(text));
        assert!(matches!(result, Err(LammpsDataError::Parse { line: 25, .. })));
    }
}
