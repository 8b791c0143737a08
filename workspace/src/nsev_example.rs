use ndarray as nd;
use num_complex::Complex64 as C64;
use tracing_subscriber::EnvFilter;
use akns::{ nsev::nsev, options::NsevOptions, DEF_M, DEF_XI };

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    // constant field on [-1, 1]
    let d: usize = 256;
    let t_bounds = (-1.0, 1.0);
    let q: nd::Array1<C64> = nd::Array1::from_elem(d, C64::new(2.0, 0.0));
    let opts = NsevOptions::default();
    println!("{}", opts);
    let res = nsev(&q, t_bounds, DEF_XI, 8, &opts)?;
    println!("status: {}", res.status);
    if let Some(xi) = res.bound_states() {
        println!("bound states:      {}", xi);
    }
    if let Some(b) = res.norming_constants() {
        println!("norming constants: {}", b);
    }
    if let Some(rho) = res.reflection() {
        println!("reflection:");
        for r in rho.iter() { println!("  {:+.8}", r); }
    }

    // three-soliton field
    let t: nd::Array1<f64> = nd::Array1::linspace(-10.0, 10.0, 512);
    let q: nd::Array1<C64> = t.mapv(|tk| C64::new(3.5 / tk.cosh(), 0.0));
    let opts = NsevOptions::from_codes(17, 1, 2, 2, 2, 2)?;
    let res = nsev(&q, (-10.0, 10.0), DEF_XI, DEF_M, &opts)?;
    println!("status: {}", res.status);
    if let (Some(xi), Some(b), Some(c))
        = (res.bound_states(), res.norming_constants(), res.residues())
    {
        for ((xk, bk), ck) in xi.iter().zip(b).zip(c) {
            println!("  ξ = {:+.8}  b = {:+.6}  b/a' = {:+.6}", xk, bk, ck);
        }
    }
    Ok(())
}
