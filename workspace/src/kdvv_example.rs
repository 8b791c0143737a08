use ndarray as nd;
use num_complex::Complex64 as C64;
use tracing_subscriber::EnvFilter;
use akns::{ kdvv::kdvv, options::{ ContSpecType, KdvvOptions }, DEF_M, DEF_XI };

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let d: usize = 512;
    let t_bounds = (-3.0, 3.0);
    let t: nd::Array1<f64> = nd::Array1::linspace(t_bounds.0, t_bounds.1, d);
    let u: nd::Array1<C64> = t.mapv(|tk| C64::new(2.0 * (-tk * tk).exp(), 0.0));
    let opts = KdvvOptions { contspec_type: ContSpecType::Both, ..KdvvOptions::new() };
    println!("{}", opts);
    let res = kdvv(&u, t_bounds, DEF_XI, DEF_M, &opts)?;
    println!("status: {}", res.status);
    if let (Some(xi), Some(rho), Some(a))
        = (res.contspec.as_ref().map(|c| &c.xi), res.reflection(), res.a())
    {
        for ((xk, rk), ak) in xi.iter().zip(rho).zip(a).step_by(8) {
            println!("  ξ = {:+.4}  ρ = {:+.6}  |a| = {:.6}", xk, rk, ak.norm());
        }
    }
    Ok(())
}
