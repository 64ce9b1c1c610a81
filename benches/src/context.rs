use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(serde::Serialize)]
pub struct Context {
    pub title: String,
    pub users: Vec<User>,
}

#[derive(serde::Serialize)]
pub struct User {
    pub name: String,
    pub age: u32,
    pub is_disabled: bool,
}

/// Generate `n` users, the same ones for the same seed.
pub fn random(n: usize, seed: u64) -> Context {
    let mut rng = StdRng::seed_from_u64(seed);
    let title = word(&mut rng);
    let users = (0..n)
        .map(|_| User {
            name: word(&mut rng),
            age: rng.gen_range(21..100),
            is_disabled: rng.gen_ratio(1, 4),
        })
        .collect();
    Context { title, users }
}

fn word(rng: &mut StdRng) -> String {
    (0..20).map(|_| rng.gen_range('a'..='z')).collect()
}
