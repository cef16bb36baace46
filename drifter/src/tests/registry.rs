use std::{ffi::c_void, hint::black_box};

use libdetour::{
    DetourState, config::AddressTable, declare_detour, flush_all_detours, hook::registry,
};

type GreetFn = extern "C" fn(u8) -> u8;

#[inline(never)]
extern "C" fn greet(x: u8) -> u8 {
    black_box(x).wrapping_add(black_box(1))
}

#[inline(never)]
extern "C" fn farewell(x: u8) -> u8 {
    black_box(x).wrapping_add(black_box(2))
}

#[inline(never)]
extern "C" fn greet_detour(x: u8) -> u8 {
    let original = unsafe { Greet.call((x,)) }.unwrap_or(0);
    original.wrapping_mul(10)
}

#[inline(never)]
extern "C" fn farewell_detour(x: u8) -> u8 {
    let original = unsafe { Farewell.call((x,)) }.unwrap_or(0);
    original.wrapping_mul(100)
}

declare_detour! {
    static Greet: GreetFn = greet_detour;
    static Farewell: GreetFn = farewell_detour;
}

fn call(f: GreetFn, x: u8) -> u8 {
    let f: GreetFn = black_box(f);
    f(x)
}

pub fn test_declared_detours() -> anyhow::Result<()> {
    let config = AddressTable::new()
        .with("Greet", greet as *const c_void)
        .with("Farewell", farewell as *const c_void);

    Greet.create(&config)?;
    Farewell.create(&config)?;

    let names = registry::global().names();
    if !names.iter().any(|n| n == "Greet") || !names.iter().any(|n| n == "Farewell") {
        anyhow::bail!("declared detours missing from registry: {:?}", names);
    }

    Greet.enable()?;
    Farewell.enable()?;

    if call(greet, 1) != 20 || call(farewell, 1) != 300 {
        anyhow::bail!(
            "declared detours not active: greet {} farewell {}",
            call(greet, 1),
            call(farewell, 1)
        );
    }

    Ok(())
}

pub fn test_flush_all_detours() -> anyhow::Result<()> {
    flush_all_detours();

    if !registry::global().is_empty() {
        anyhow::bail!("registry not empty after flush: {:?}", registry::global());
    }

    for (name, state) in [("Greet", Greet.state()), ("Farewell", Farewell.state())] {
        if state != DetourState::Freed {
            anyhow::bail!("{} left in state {}", name, state);
        }
    }

    if call(greet, 1) != 2 || call(farewell, 1) != 3 {
        anyhow::bail!("targets not restored after flush");
    }

    // Flushing an empty registry is a no-op
    flush_all_detours();

    Ok(())
}
