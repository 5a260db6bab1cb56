//! The boundary against a real engine session, for both strategies.

mod common;

use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};

use scanguard::boundary::{self, Boundary, Outcome, Strategy};
use scanguard_engine::{ColorSpace, Decompress, ErrorMgr, FaultPoint, GlobalState, Message};

use common::{checker, encode, rgba_bytes, small_image, truncated_header};

thread_local! {
    static EXITS: Cell<u32> = const { Cell::new(0) };
}

/// Counts invocations and returns, like a diagnostic-only handler.
fn counting_exit(_session: &mut Decompress<'_>) {
    EXITS.with(|n| n.set(n.get() + 1));
}

fn quiet_output(_session: &mut Decompress<'_>) {}

fn counting_reporter() -> ErrorMgr {
    EXITS.with(|n| n.set(0));
    ErrorMgr {
        error_exit: counting_exit,
        output_message: quiet_output,
        ..ErrorMgr::diagnostic()
    }
}

fn exits() -> u32 {
    EXITS.with(Cell::get)
}

fn boundaries() -> [Boundary; 2] {
    [
        Boundary::new(Strategy::Unwind),
        Boundary::new(Strategy::Fiber {
            stack_size: 256 * 1024,
        }),
    ]
}

#[test]
fn scenario_a_truncated_header_then_fresh_session() {
    let truncated = truncated_header(9);
    let valid = small_image();

    for boundary in boundaries() {
        let mut err = counting_reporter();
        let mut session = Decompress::new(&mut err);
        session.set_source(&truncated);
        assert!(!boundary.try_read_header(&mut session, true));
        drop(session);
        assert_eq!(err.msg_code, Some(Message::TruncatedHeader { available: 9 }));

        let mut fresh_err = counting_reporter();
        let mut fresh = Decompress::new(&mut fresh_err);
        fresh.set_source(&valid);
        assert!(boundary.try_read_header(&mut fresh, true));
        assert_eq!(fresh.global_state(), GlobalState::Ready);
    }
}

#[test]
fn scenario_b_header_start_and_one_row() {
    let pixels = checker(4, 3);
    let data = encode(4, 3, 4, &pixels);

    for boundary in boundaries() {
        let mut err = counting_reporter();
        let mut session = Decompress::new(&mut err);
        session.set_source(&data);

        assert!(boundary.try_read_header(&mut session, true));
        assert!(boundary.try_start_decompress(&mut session));

        let mut row = vec![0u8; session.row_stride()];
        assert!(boundary.try_read_scanlines(&mut session, &mut row, 1));
        assert_eq!(session.output_scanline, 1);
        assert_eq!(row, rgba_bytes(&pixels[..4]));
        assert_eq!(exits(), 0);
    }
}

#[test]
fn scenario_c_injected_scanline_fault() {
    let data = small_image();

    for boundary in boundaries() {
        let mut err = counting_reporter();
        let mut session = Decompress::new(&mut err);
        let binding = session.error_binding();
        session.set_source(&data);
        session.inject_fault(FaultPoint::Scanline(1));

        assert!(boundary.try_read_header(&mut session, true));
        assert!(boundary.try_start_decompress(&mut session));
        let mut row = vec![0u8; session.row_stride()];
        assert!(boundary.try_read_scanlines(&mut session, &mut row, 1));
        assert!(!boundary.try_read_scanlines(&mut session, &mut row, 1));
        assert_eq!(session.error_binding(), binding);
        assert_eq!(session.reporter().msg_code, Some(Message::InjectedFault));
        drop(session);
        assert_eq!(exits(), 1);

        // An unrelated session is unaffected.
        let mut other_err = counting_reporter();
        let mut other = Decompress::new(&mut other_err);
        other.set_source(&data);
        assert!(boundary.try_read_header(&mut other, true));
        assert!(boundary.try_start_decompress(&mut other));
        let mut rows = vec![0u8; other.row_stride() * 3];
        assert!(boundary.try_read_scanlines(&mut other, &mut rows, 3));
        assert!(boundary.try_finish_decompress(&mut other));
        assert_eq!(exits(), 0);
    }
}

#[test]
fn binding_is_restored_on_both_paths() {
    let valid = small_image();
    let bad = b"qoif\x00\x00\x00\x01\x00\x00\x00\x01\x05\x00".to_vec();

    for boundary in boundaries() {
        let mut err = counting_reporter();
        let original_exit = err.error_exit;
        let mut session = Decompress::new(&mut err);
        let binding = session.error_binding();

        session.set_source(&bad);
        assert!(!boundary.try_read_header(&mut session, true));
        assert_eq!(session.error_binding(), binding);
        assert!(std::ptr::fn_addr_eq(session.reporter().error_exit, original_exit));
        assert_eq!(session.reporter().msg_code, Some(Message::BadChannels(5)));

        session.set_source(&valid);
        assert!(boundary.try_read_header(&mut session, true));
        assert_eq!(session.error_binding(), binding);
        assert!(std::ptr::fn_addr_eq(session.reporter().error_exit, original_exit));
    }
}

#[test]
fn original_error_exit_runs_once_per_failure() {
    let data = small_image();

    for boundary in boundaries() {
        let mut err = counting_reporter();
        let mut session = Decompress::new(&mut err);

        // No source yet.
        assert!(!boundary.try_read_header(&mut session, true));
        assert_eq!(exits(), 1);

        session.set_source(&data);
        assert!(boundary.try_read_header(&mut session, true));
        assert_eq!(exits(), 1);

        // Finishing before any row was read.
        assert!(boundary.try_start_decompress(&mut session));
        assert!(!boundary.try_finish_decompress(&mut session));
        assert_eq!(exits(), 2);
        assert_eq!(
            session.reporter().msg_code,
            Some(Message::TooLittleData { read: 0, height: 3 })
        );
    }
}

#[test]
fn repeated_calls_after_failure_start_clean() {
    for boundary in boundaries() {
        let mut err = counting_reporter();
        let mut session = Decompress::new(&mut err);
        let binding = session.error_binding();

        for attempt in 1..=3 {
            assert!(!boundary.try_start_decompress(&mut session));
            assert_eq!(session.error_binding(), binding);
            assert_eq!(exits(), attempt);
            assert_eq!(
                session.reporter().msg_code,
                Some(Message::BadState(GlobalState::Start))
            );
        }
    }
}

#[test]
fn success_keeps_the_operation_side_effects() {
    let data = small_image();

    for boundary in boundaries() {
        let mut err = counting_reporter();
        let mut session = Decompress::new(&mut err);
        session.set_source(&data);

        let outcome = boundary.protect(&mut session, |s| {
            s.read_header(true);
            s.out_color_space = ColorSpace::Grayscale;
            s.start_decompress();
            s.output_components
        });
        assert_eq!(outcome, Outcome::Success(1));
        assert_eq!(session.global_state(), GlobalState::Scanning);
        assert_eq!(session.row_stride(), 4);
    }
}

#[test]
fn foreign_panics_propagate_after_restoring_the_binding() {
    for boundary in boundaries() {
        let mut err = counting_reporter();
        let mut session = Decompress::new(&mut err);
        let binding = session.error_binding();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            boundary.protect(&mut session, |_| -> () { panic!("caller bug") })
        }));
        let payload = result.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"caller bug"));
        assert_eq!(session.error_binding(), binding);
        assert_eq!(exits(), 0);
    }
}

#[test]
fn nested_boundaries_on_two_sessions() {
    let valid = small_image();
    let truncated = truncated_header(6);

    for outer in boundaries() {
        for inner in boundaries() {
            let mut outer_err = counting_reporter();
            let mut inner_err = ErrorMgr {
                output_message: quiet_output,
                ..ErrorMgr::diagnostic()
            };
            let mut outer_session = Decompress::new(&mut outer_err);
            let mut inner_session = Decompress::new(&mut inner_err);
            outer_session.set_source(&valid);
            inner_session.set_source(&truncated);
            let outer_binding = outer_session.error_binding();
            let inner_binding = inner_session.error_binding();

            // Inner failure is absorbed by the inner boundary.
            let outcome = outer.protect(&mut outer_session, |s| {
                let inner_ok = inner.try_read_header(&mut inner_session, true);
                s.read_header(true);
                inner_ok
            });
            assert_eq!(outcome, Outcome::Success(false));
            assert_eq!(inner_session.error_binding(), inner_binding);

            // Outer failure after an inner success.
            inner_session.set_source(&valid);
            let outcome = outer.protect(&mut outer_session, |s| {
                assert!(inner.try_read_header(&mut inner_session, true));
                s.finish_decompress();
            });
            assert_eq!(outcome, Outcome::Failure);
            assert_eq!(outer_session.error_binding(), outer_binding);
            assert_eq!(inner_session.error_binding(), inner_binding);
            assert_eq!(exits(), 1);
        }
    }
}

#[test]
fn outer_failure_inside_an_inner_boundary() {
    let valid = small_image();

    for outer in boundaries() {
        for inner in boundaries() {
            let mut outer_err = counting_reporter();
            let mut inner_err = ErrorMgr {
                output_message: quiet_output,
                ..ErrorMgr::diagnostic()
            };
            let mut outer_session = Decompress::new(&mut outer_err);
            let mut inner_session = Decompress::new(&mut inner_err);
            let outer_binding = outer_session.error_binding();
            let inner_binding = inner_session.error_binding();

            // The outer session has no source, so its fault fires while the
            // inner boundary is still active.
            let outcome = outer.protect(&mut outer_session, |s| {
                let _ = inner.protect(&mut inner_session, |_| s.read_header(true));
            });
            assert_eq!(outcome, Outcome::Failure, "{outer:?}/{inner:?}");
            assert_eq!(outer_session.error_binding(), outer_binding, "{outer:?}/{inner:?}");
            assert_eq!(inner_session.error_binding(), inner_binding, "{outer:?}/{inner:?}");
            assert_eq!(exits(), 1);

            // The inner session is still usable afterwards.
            inner_session.set_source(&valid);
            assert!(inner.try_read_header(&mut inner_session, true));
            assert_eq!(inner_session.global_state(), GlobalState::Ready);
        }
    }
}

#[test]
fn failure_drops_values_owned_by_the_operation() {
    struct Tracked;
    impl Drop for Tracked {
        fn drop(&mut self) {
            DROPS.with(|n| n.set(n.get() + 1));
        }
    }
    thread_local! {
        static DROPS: Cell<u32> = const { Cell::new(0) };
    }

    for boundary in boundaries() {
        DROPS.with(|n| n.set(0));
        let mut err = counting_reporter();
        let mut session = Decompress::new(&mut err);

        let tracked = Tracked;
        let outcome = boundary.protect(&mut session, move |s| {
            let _held = tracked;
            s.read_header(true);
        });
        assert_eq!(outcome, Outcome::Failure);
        assert_eq!(DROPS.with(Cell::get), 1, "{boundary:?}");
    }
}

#[test]
fn nested_boundaries_on_one_session() {
    let data = small_image();

    for outer in boundaries() {
        for inner in boundaries() {
            let mut err = counting_reporter();
            let mut session = Decompress::new(&mut err);
            let binding = session.error_binding();
            session.set_source(&data);

            let outcome = outer.protect(&mut session, |s| {
                // Starting before the header is read fails inside.
                let started = inner.try_start_decompress(s);
                s.read_header(true);
                started
            });
            assert_eq!(outcome, Outcome::Success(false));
            assert_eq!(session.error_binding(), binding);
            assert_eq!(session.global_state(), GlobalState::Ready);
            drop(session);
            assert_eq!(exits(), 1);
            assert_eq!(err.msg_code, Some(Message::BadState(GlobalState::Start)));
        }
    }
}

#[test]
fn warnings_pass_through_to_the_original_reporter() {
    let mut data = small_image();
    data.extend_from_slice(b"tail");

    for boundary in boundaries() {
        let mut err = counting_reporter();
        let mut session = Decompress::new(&mut err);
        session.set_source(&data);
        assert!(boundary.try_read_header(&mut session, true));
        assert!(boundary.try_start_decompress(&mut session));
        let mut rows = vec![0u8; session.row_stride() * 3];
        assert!(boundary.try_read_scanlines(&mut session, &mut rows, 3));
        assert!(boundary.try_finish_decompress(&mut session));
        drop(session);

        assert_eq!(err.msg_code, Some(Message::ExtraneousData(4)));
        assert_eq!(err.num_warnings, 1);
        assert_eq!(exits(), 0);
    }
}

#[test]
fn free_functions_use_the_default_boundary() {
    let data = small_image();
    let mut err = counting_reporter();
    let mut session = Decompress::new(&mut err);

    assert!(!boundary::try_read_header(&mut session, true));
    session.set_source(&data);
    assert!(boundary::try_read_header(&mut session, true));
    assert!(boundary::try_start_decompress(&mut session));
    let mut rows = vec![0u8; session.row_stride() * 3];
    assert!(boundary::try_read_scanlines(&mut session, &mut rows, 3));
    assert!(boundary::try_finish_decompress(&mut session));
    assert_eq!(exits(), 1);
}
