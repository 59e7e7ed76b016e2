// Prints wheel powers for a handful of stick positions
//
// Usage: cargo run --example mixer_table [-- --legacy]

use mecanum_drive_runtime::motor::{MecanumMixer, MixerConfig, SpeedFormula};

const CASES: [(&str, f64, f64, f64); 9] = [
    ("idle", 0.0, 0.0, 0.0),
    ("forward", 0.0, 100.0, 0.0),
    ("back", 0.0, -100.0, 0.0),
    ("strafe +x", 100.0, 0.0, 0.0),
    ("strafe -x", -100.0, 0.0, 0.0),
    ("diagonal", 100.0, 100.0, 0.0),
    ("rotate", 0.0, 0.0, 100.0),
    ("half forward", 0.0, 50.0, 0.0),
    ("arc", 0.0, 80.0, 40.0),
];

fn main() {
    let formula = if std::env::args().any(|a| a == "--legacy") {
        SpeedFormula::LegacyDoubledY
    } else {
        SpeedFormula::Euclidean
    };
    let mixer = MecanumMixer::new(MixerConfig::default().with_speed_formula(formula));

    println!("speed formula: {:?}", formula);
    println!(
        "{:<14}{:>7}{:>7}{:>7} |{:>8}{:>8}{:>8}{:>8}{:>8}",
        "case", "x", "y", "rot", "speed", "fl", "fr", "rl", "rr"
    );
    for (name, x, y, r) in CASES {
        let (w, t) = mixer.mix_traced(x, y, r);
        println!(
            "{:<14}{:>7.0}{:>7.0}{:>7.0} |{:>8.3}{:>8.1}{:>8.1}{:>8.1}{:>8.1}",
            name, x, y, r, t.speed, w.front_left, w.front_right, w.rear_left, w.rear_right
        );
    }
}
