//! HITRAN molecule and isotopologue identifiers with isotopologue masses.
//!
//! Molecule ids, global isotopologue ids and masses follow the HITRAN
//! `molparam` tables for the molecules routinely modelled in the mid-IR.

use super::constants::{ATOMIC_MASS_UNIT, BOLTZMANN};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Isotopologue {
    pub local_id: u32,
    pub global_id: u32,
    pub code: &'static str,
    pub mass_amu: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Molecule {
    pub name: &'static str,
    pub hitran_id: u32,
    pub isotopologues: &'static [Isotopologue],
}

impl Molecule {
    pub fn isotopologue(&self, local_id: u32) -> Option<&'static Isotopologue> {
        self.isotopologues
            .iter()
            .find(|isotopologue| isotopologue.local_id == local_id)
    }
}

const fn iso(local_id: u32, global_id: u32, code: &'static str, mass_amu: f64) -> Isotopologue {
    Isotopologue {
        local_id,
        global_id,
        code,
        mass_amu,
    }
}

pub static MOLECULES: [Molecule; 25] = [
    Molecule {
        name: "H2O",
        hitran_id: 1,
        isotopologues: &[
            iso(1, 1, "161", 18.010_565),
            iso(2, 2, "181", 20.014_811),
            iso(3, 3, "171", 19.014_780),
            iso(4, 4, "162", 19.016_740),
            iso(5, 5, "182", 21.020_985),
            iso(6, 6, "172", 20.020_956),
        ],
    },
    Molecule {
        name: "CO2",
        hitran_id: 2,
        isotopologues: &[
            iso(1, 7, "626", 43.989_830),
            iso(2, 8, "636", 44.993_185),
            iso(3, 9, "628", 45.994_076),
            iso(4, 10, "627", 44.994_045),
        ],
    },
    Molecule {
        name: "O3",
        hitran_id: 3,
        isotopologues: &[iso(1, 16, "666", 47.984_745)],
    },
    Molecule {
        name: "N2O",
        hitran_id: 4,
        isotopologues: &[
            iso(1, 21, "446", 44.001_062),
            iso(2, 22, "456", 44.998_096),
            iso(3, 23, "546", 44.998_096),
        ],
    },
    Molecule {
        name: "CO",
        hitran_id: 5,
        isotopologues: &[
            iso(1, 26, "26", 27.994_915),
            iso(2, 27, "36", 28.998_270),
            iso(3, 28, "28", 29.999_161),
            iso(4, 29, "27", 28.999_130),
            iso(5, 30, "38", 31.002_516),
            iso(6, 31, "37", 30.002_485),
        ],
    },
    Molecule {
        name: "CH4",
        hitran_id: 6,
        isotopologues: &[
            iso(1, 32, "211", 16.031_300),
            iso(2, 33, "311", 17.034_655),
            iso(3, 34, "212", 17.037_475),
        ],
    },
    Molecule {
        name: "O2",
        hitran_id: 7,
        isotopologues: &[iso(1, 36, "66", 31.989_830)],
    },
    Molecule {
        name: "NO",
        hitran_id: 8,
        isotopologues: &[iso(1, 39, "46", 29.997_989)],
    },
    Molecule {
        name: "SO2",
        hitran_id: 9,
        isotopologues: &[iso(1, 42, "626", 63.961_901)],
    },
    Molecule {
        name: "NO2",
        hitran_id: 10,
        isotopologues: &[iso(1, 44, "646", 45.992_904)],
    },
    Molecule {
        name: "NH3",
        hitran_id: 11,
        isotopologues: &[
            iso(1, 45, "4111", 17.026_549),
            iso(2, 46, "5111", 18.023_583),
        ],
    },
    Molecule {
        name: "HNO3",
        hitran_id: 12,
        isotopologues: &[iso(1, 47, "146", 62.995_644)],
    },
    Molecule {
        name: "OH",
        hitran_id: 13,
        isotopologues: &[
            iso(1, 48, "61", 17.002_740),
            iso(2, 49, "81", 19.006_986),
            iso(3, 50, "62", 18.008_915),
        ],
    },
    Molecule {
        name: "HF",
        hitran_id: 14,
        isotopologues: &[iso(1, 51, "19", 20.006_229)],
    },
    Molecule {
        name: "HCl",
        hitran_id: 15,
        isotopologues: &[
            iso(1, 52, "15", 35.976_678),
            iso(2, 53, "17", 37.973_729),
        ],
    },
    Molecule {
        name: "HBr",
        hitran_id: 16,
        isotopologues: &[
            iso(1, 54, "19", 79.926_160),
            iso(2, 55, "11", 81.924_115),
        ],
    },
    Molecule {
        name: "HI",
        hitran_id: 17,
        isotopologues: &[iso(1, 56, "17", 127.912_297)],
    },
    Molecule {
        name: "OCS",
        hitran_id: 19,
        isotopologues: &[iso(1, 59, "622", 59.966_986)],
    },
    Molecule {
        name: "H2CO",
        hitran_id: 20,
        isotopologues: &[iso(1, 64, "126", 30.010_565)],
    },
    Molecule {
        name: "N2",
        hitran_id: 22,
        isotopologues: &[iso(1, 69, "44", 28.006_148)],
    },
    Molecule {
        name: "HCN",
        hitran_id: 23,
        isotopologues: &[
            iso(1, 70, "124", 27.010_899),
            iso(2, 71, "134", 28.014_254),
            iso(3, 72, "125", 28.007_933),
        ],
    },
    Molecule {
        name: "C2H2",
        hitran_id: 26,
        isotopologues: &[
            iso(1, 76, "1221", 26.015_650),
            iso(2, 77, "1231", 27.019_005),
        ],
    },
    Molecule {
        name: "C2H6",
        hitran_id: 27,
        isotopologues: &[iso(1, 78, "1221", 30.046_950)],
    },
    Molecule {
        name: "PH3",
        hitran_id: 28,
        isotopologues: &[iso(1, 79, "1111", 33.997_238)],
    },
    Molecule {
        name: "H2",
        hitran_id: 45,
        isotopologues: &[iso(1, 103, "11", 2.015_650), iso(2, 115, "12", 3.021_825)],
    },
];

pub fn molecule_by_name(name: &str) -> Option<&'static Molecule> {
    let normalized = name.trim();
    if normalized.is_empty() {
        return None;
    }

    MOLECULES
        .iter()
        .find(|molecule| molecule.name == normalized)
        .or_else(|| {
            MOLECULES
                .iter()
                .find(|molecule| molecule.name.eq_ignore_ascii_case(normalized))
        })
}

pub fn molecule_identifier(name: &str) -> Option<u32> {
    molecule_by_name(name).map(|molecule| molecule.hitran_id)
}

pub fn global_identifier(name: &str, isotopologue_number: u32) -> Option<u32> {
    molecule_by_name(name)?
        .isotopologue(isotopologue_number)
        .map(|isotopologue| isotopologue.global_id)
}

pub fn molecular_mass_amu(name: &str, isotopologue_number: u32) -> Option<f64> {
    molecule_by_name(name)?
        .isotopologue(isotopologue_number)
        .map(|isotopologue| isotopologue.mass_amu)
}

/// One-dimensional thermal velocity dispersion sqrt(kT/m), m/s.
pub fn thermal_velocity(mass_amu: f64, temperature: f64) -> f64 {
    (BOLTZMANN * temperature / (mass_amu * ATOMIC_MASS_UNIT)).sqrt()
}
