use std::{io::Read, ptr::NonNull};

use rallocator::{Heap, SearchMode, Sbrk};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap` or
/// `gdb` between steps.
fn block_until_enter_pressed(interactive: bool) {
  if !interactive {
    return;
  }

  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break.
fn print_program_break(label: &str) {
  println!(
    "[{}] PID = {}, program break = {:?}",
    label,
    std::process::id(),
    Sbrk::program_break(),
  );
}

fn allocate(
  heap: &mut Heap<Sbrk>,
  size: usize,
  name: &str,
) -> NonNull<u8> {
  let address = match heap.allocate(size) {
    Ok(address) => address,
    Err(e) => {
      eprintln!("allocation of {} bytes failed: {}", size, e);
      std::process::exit(1);
    }
  };

  unsafe {
    let _ = heap.set_name(address.as_ptr(), name);
  }

  println!("Allocated {:>5} bytes for {}, address = {:?}", size, name, address);
  address
}

fn main() {
  let interactive = std::env::args().any(|arg| arg == "--step");
  let search = match std::env::args().nth(1).as_deref() {
    Some("best") => SearchMode::BestFit,
    Some("worst") => SearchMode::WorstFit,
    _ => SearchMode::FirstFit,
  };

  let mut heap = Heap::sbrk();
  heap.set_search_mode(search);

  print_program_break("start");
  block_until_enter_pressed(interactive);

  // --------------------------------------------------------------------
  // 1) Six blocks that fit one arena page together.
  // --------------------------------------------------------------------
  println!("\n[1] Allocate A..F");
  let _a = allocate(&mut heap, 132, "A");
  let b = allocate(&mut heap, 42, "B");
  let _c = allocate(&mut heap, 132, "C");
  let d = allocate(&mut heap, 132, "D");
  let _e = allocate(&mut heap, 132, "E");
  let _f = allocate(&mut heap, 3132, "F");

  print_program_break("after A..F");
  block_until_enter_pressed(interactive);

  // --------------------------------------------------------------------
  // 2) Release B, then D. The free list keeps that order.
  // --------------------------------------------------------------------
  unsafe {
    let _ = heap.release(b.as_ptr());
    let _ = heap.release(d.as_ptr());
  }
  println!("\n[2] Released B and D");
  heap.print_state();
  block_until_enter_pressed(interactive);

  // --------------------------------------------------------------------
  // 3) First fit takes B, best fit takes B, worst fit takes D.
  // --------------------------------------------------------------------
  println!("\n[3] Allocate G with {:?}", search);
  let g = allocate(&mut heap, 42, "G");
  println!(
    "[3] G reused {}",
    if g == b {
      "B"
    } else if g == d {
      "D"
    } else {
      "nothing"
    }
  );

  println!();
  heap.print_state();

  // --------------------------------------------------------------------
  // 4) End of demo. The arena is never handed back; the OS reclaims it
  //    when the process exits.
  // --------------------------------------------------------------------
  println!("\n[4] Arena grew {} time(s), {} bytes", heap.growths(), heap.arena_bytes());
}
