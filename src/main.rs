use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use log::{error, info};
use sdl2::audio::{AudioCallback, AudioSpecDesired};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::Color;
use sdl2::rect::Rect;
use sdl2::render::Canvas;
use sdl2::video::Window;

use chip8_emu::{interpreter, ExecutionState, Interpreter, Machine, DISPLAY_HEIGHT, DISPLAY_WIDTH};

const FRAME: Duration = Duration::from_micros(16_667); // 60 Hz

#[derive(Parser, Debug)]
#[command(version, about = "CHIP-8 emulator")]
struct Args {
    /// Path to the ROM file to run
    rom: PathBuf,

    /// Instructions per second
    #[arg(long, default_value_t = 500)]
    ips: u32,

    /// Window pixels per CHIP-8 pixel
    #[arg(long, default_value_t = 10)]
    scale: u32,
}

/// 440 Hz square wave while the sound timer runs.
struct SquareWave {
    phase_inc: f32,
    phase: f32,
    volume: f32,
}

impl AudioCallback for SquareWave {
    type Channel = f32;

    fn callback(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = if self.phase < 0.5 {
                self.volume
            } else {
                -self.volume
            };
            self.phase = (self.phase + self.phase_inc) % 1.0;
        }
    }
}

/// QWERTY mapping for the hex keypad:
///
/// ```text
/// 1 2 3 C        1 2 3 4
/// 4 5 6 D   <-   Q W E R
/// 7 8 9 E        A S D F
/// A 0 B F        Z X C V
/// ```
fn keypad_index(keycode: Keycode) -> Option<u8> {
    match keycode {
        Keycode::Num1 => Some(0x1),
        Keycode::Num2 => Some(0x2),
        Keycode::Num3 => Some(0x3),
        Keycode::Num4 => Some(0xC),
        Keycode::Q => Some(0x4),
        Keycode::W => Some(0x5),
        Keycode::E => Some(0x6),
        Keycode::R => Some(0xD),
        Keycode::A => Some(0x7),
        Keycode::S => Some(0x8),
        Keycode::D => Some(0x9),
        Keycode::F => Some(0xE),
        Keycode::Z => Some(0xA),
        Keycode::X => Some(0x0),
        Keycode::C => Some(0xB),
        Keycode::V => Some(0xF),
        _ => None,
    }
}

fn render(canvas: &mut Canvas<Window>, machine: &Machine, scale: u32) -> Result<(), String> {
    canvas.set_draw_color(Color::RGB(0, 0, 0));
    canvas.clear();
    canvas.set_draw_color(Color::RGB(255, 255, 255));
    for (i, &lit) in machine.display().iter().enumerate() {
        if !lit {
            continue;
        }
        let x = (i % DISPLAY_WIDTH) as i32 * scale as i32;
        let y = (i / DISPLAY_WIDTH) as i32 * scale as i32;
        canvas.fill_rect(Rect::new(x, y, scale, scale))?;
    }
    canvas.present();
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut machine = Machine::load_from(&mut File::open(&args.rom)?)?;

    let sdl_ctx = sdl2::init()?;
    let video = sdl_ctx.video()?;
    let window = video
        .window(
            "CHIP-8",
            DISPLAY_WIDTH as u32 * args.scale,
            DISPLAY_HEIGHT as u32 * args.scale,
        )
        .position_centered()
        .build()?;
    let mut canvas = window.into_canvas().build()?;

    let audio = sdl_ctx.audio()?;
    let desired = AudioSpecDesired {
        freq: Some(44_100),
        channels: Some(1),
        samples: None,
    };
    let beep = audio.open_playback(None, &desired, |spec| SquareWave {
        phase_inc: 440.0 / spec.freq as f32,
        phase: 0.0,
        volume: 0.05,
    })?;

    let mut event_pump = sdl_ctx.event_pump()?;
    let mut interp = Interpreter::new();
    let steps_per_frame = (args.ips / 60).max(1);

    info!("running {} at {} ips", args.rom.display(), args.ips);

    while machine.execution_state() != ExecutionState::Halted {
        let frame_start = Instant::now();

        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => machine.halt(),
                Event::KeyDown {
                    keycode: Some(Keycode::Space),
                    ..
                } => match machine.execution_state() {
                    ExecutionState::Running => {
                        machine.pause();
                        info!("paused");
                    }
                    ExecutionState::Paused => {
                        machine.resume();
                        info!("resumed");
                    }
                    ExecutionState::Halted => {}
                },
                Event::KeyDown {
                    keycode: Some(k), ..
                } => {
                    if let Some(key) = keypad_index(k) {
                        machine.set_key(key, true);
                    }
                }
                Event::KeyUp {
                    keycode: Some(k), ..
                } => {
                    if let Some(key) = keypad_index(k) {
                        machine.set_key(key, false);
                    }
                }
                _ => {}
            }
        }

        if machine.execution_state() == ExecutionState::Running {
            for _ in 0..steps_per_frame {
                if let Err(e) = interp.step(&mut machine) {
                    error!("emulation fault: {e}");
                    machine.halt();
                    break;
                }
            }
            // timers freeze with the machine, so only tick while running
            if interpreter::tick_timers(&mut machine) {
                beep.resume();
            } else {
                beep.pause();
            }
        } else {
            beep.pause();
        }

        render(&mut canvas, &machine, args.scale)?;

        let elapsed = frame_start.elapsed();
        if elapsed < FRAME {
            thread::sleep(FRAME - elapsed);
        }
    }

    Ok(())
}
