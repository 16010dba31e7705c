/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn next_usize(&mut self, upper: usize) -> usize {
        (self.next_u64() % upper as u64) as usize
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

const RAW_FILES_A: [&str; 3] = [
    "LFQ_Orbitrap_DDA_Condition_A_Sample_Alpha_01",
    "LFQ_Orbitrap_DDA_Condition_A_Sample_Alpha_02",
    "LFQ_Orbitrap_DDA_Condition_A_Sample_Alpha_03",
];
const RAW_FILES_B: [&str; 3] = [
    "LFQ_Orbitrap_DDA_Condition_B_Sample_Alpha_01",
    "LFQ_Orbitrap_DDA_Condition_B_Sample_Alpha_02",
    "LFQ_Orbitrap_DDA_Condition_B_Sample_Alpha_03",
];

/// (suffix, peptidoform count, condition A over condition B ratio)
const SPECIES: [(&str, usize, f64); 3] =
    [("HUMAN", 120, 1.0), ("YEAST", 40, 0.5), ("ECOLI", 30, 1.5)];

const AMINO_ACIDS: &[u8] = b"ACDEFGHIKLMNPQRSTVWY";

fn random_sequence(rng: &mut SimpleRng) -> String {
    let len = 7 + rng.next_usize(8);
    let mut seq: String = (0..len)
        .map(|_| AMINO_ACIDS[rng.next_usize(AMINO_ACIDS.len())] as char)
        .collect();
    // Tryptic C-terminus.
    seq.push(if rng.next_f64() < 0.5 { 'K' } else { 'R' });
    seq
}

fn main() {
    let mut rng = SimpleRng::new(42);

    let output_path = "sample_alphapept.csv";
    let mut writer = csv::Writer::from_path(output_path).expect("Failed to create output file");
    writer
        .write_record([
            "shortname",
            "protein",
            "sequence",
            "charge",
            "decoy",
            "ms1_int_sum_apex_dn",
        ])
        .expect("Failed to write header");

    let mut n_rows = 0usize;
    let mut protein_id = 0usize;

    for (species, count, ratio) in SPECIES {
        for pep_idx in 0..count {
            protein_id += 1;
            let mut protein = format!("sp|P{protein_id:05}|PROT{protein_id}_{species}");
            // A few contaminant entries per species.
            if pep_idx % 37 == 0 {
                protein = format!("Cont_{protein}");
            }
            let sequence = random_sequence(&mut rng);
            let charge = 2 + rng.next_usize(2);
            let base = (rng.gauss(13.0, 1.2)).exp2();
            // One peptidoform in ~20 misses one raw file and must be
            // dropped by the consistency filter.
            let dropout = if pep_idx % 20 == 7 {
                Some(rng.next_usize(6))
            } else {
                None
            };

            for (file_idx, raw_file) in RAW_FILES_A.iter().chain(RAW_FILES_B.iter()).enumerate() {
                let condition_factor = if file_idx < 3 { ratio } else { 1.0 };
                let intensity = if dropout == Some(file_idx) {
                    0.0
                } else {
                    base * condition_factor * (1.0 + rng.gauss(0.0, 0.05))
                };
                writer
                    .write_record([
                        raw_file.to_string(),
                        protein.clone(),
                        sequence.clone(),
                        charge.to_string(),
                        "False".to_string(),
                        format!("{intensity:.1}"),
                    ])
                    .expect("Failed to write row");
                n_rows += 1;
            }
        }
    }

    // Decoy hits, excluded by the decoy filter.
    for _ in 0..25 {
        protein_id += 1;
        let raw_file = RAW_FILES_A[rng.next_usize(3)];
        writer
            .write_record([
                raw_file.to_string(),
                format!("rev_sp|P{protein_id:05}|PROT{protein_id}_HUMAN"),
                random_sequence(&mut rng),
                "2".to_string(),
                "True".to_string(),
                format!("{:.1}", (rng.gauss(12.0, 1.0)).exp2()),
            ])
            .expect("Failed to write row");
        n_rows += 1;
    }

    // Ambiguous rows matching two species, excluded as multi-species.
    for file_idx in 0..6 {
        let raw_file = if file_idx < 3 {
            RAW_FILES_A[file_idx]
        } else {
            RAW_FILES_B[file_idx - 3]
        };
        writer
            .write_record([
                raw_file.to_string(),
                "sp|P99999|MIXED_HUMAN;sp|P99998|MIXED_YEAST".to_string(),
                "SHAREDPEPTIDEK".to_string(),
                "2".to_string(),
                "False".to_string(),
                format!("{:.1}", (rng.gauss(13.0, 1.0)).exp2()),
            ])
            .expect("Failed to write row");
        n_rows += 1;
    }

    writer.flush().expect("Failed to flush output file");

    println!("Wrote {n_rows} result rows to {output_path}");
}
