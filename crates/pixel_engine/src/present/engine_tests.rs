//! Tests for PresentationEngine against the loopback backend

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::core::config::PresenterConfig;
    use crate::raster;

    fn open_engine(
        surface: &LoopbackSurface,
        config: &PresenterConfig,
    ) -> (PresentationEngine<LoopbackDevice>, LoopbackProbe) {
        let probe = LoopbackProbe::new();
        let device_probe = probe.clone();
        let engine = PresentationEngine::new(Some(surface), config, |_| {
            LoopbackDevice::open(LoopbackConfig::default(), &device_probe)
        });
        (engine, probe)
    }

    fn frame_address(engine: &mut PresentationEngine<LoopbackDevice>) -> usize {
        engine.frame_buffer().expect("frame buffer available").as_ptr() as usize
    }

    #[test]
    fn test_construction_reaches_device_ready() {
        let surface = LoopbackSurface::new(400, 400);
        let (mut engine, probe) = open_engine(&surface, &PresenterConfig::default());

        assert_eq!(engine.state(), EngineState::DeviceReady);
        assert!(engine.construction_error().is_none());
        assert_eq!(engine.buffer_count(), 2);
        assert_eq!(engine.current_index(), 0);
        assert_eq!(engine.surface_id(), Some(surface.id()));
        assert!(engine.is_mapped());
        assert_eq!(probe.staging_live(), 2);

        let view = engine.frame_buffer().expect("frame buffer available");
        assert_eq!(view.size(), SurfaceSize::new(400, 400));
        assert!(view.stride() >= 1600);
    }

    #[test]
    fn test_buffer_count_is_clamped() {
        let surface = LoopbackSurface::new(8, 8);
        for (requested, expected) in [(0, 1), (1, 1), (3, 3), (16, 16), (64, 16)] {
            let config = PresenterConfig::default().with_buffer_count(requested);
            let (engine, probe) = open_engine(&surface, &config);
            assert_eq!(engine.buffer_count(), expected, "requested {requested}");
            assert_eq!(probe.staging_live(), expected);
        }
    }

    #[test]
    fn test_index_rotates_even_when_present_fails() {
        let surface = LoopbackSurface::new(16, 16);
        let config = PresenterConfig::default().with_buffer_count(3);
        let (mut engine, probe) = open_engine(&surface, &config);

        for n in 1..=4 {
            engine.present().expect("present succeeds");
            assert_eq!(engine.current_index(), n % 3);
        }

        probe.fail_next_presents(2);
        for n in 5..=6 {
            let err = engine.present().expect_err("present fails");
            assert_eq!(err, PresentError::Present(DeviceError::SurfaceLost));
            assert!(err.is_recoverable());
            assert_eq!(engine.current_index(), n % 3);
            assert!(engine.frame_buffer().is_some());
        }

        engine.present().expect("present recovers");
        assert_eq!(engine.current_index(), 7 % 3);
        assert_eq!(engine.frame_count(), 7);
        assert_eq!(probe.presented_count(), 5);
    }

    #[test]
    fn test_present_displays_the_written_buffer() {
        let surface = LoopbackSurface::new(5, 3);
        let (mut engine, probe) = open_engine(&surface, &PresenterConfig::default());

        {
            let mut view = engine.frame_buffer().expect("frame buffer available");
            for y in 0..view.height() {
                for x in 0..view.width() {
                    view.set_pixel(x, y, (y << 8) | x);
                }
            }
        }
        engine.present().expect("present succeeds");

        let frame = probe.last_frame().expect("a frame was displayed");
        assert_eq!(frame.index, 0);
        assert_eq!(frame.size, SurfaceSize::new(5, 3));
        for y in 0..3 {
            for x in 0..5 {
                assert_eq!(frame.pixel_at(x, y), Some((y << 8) | x));
            }
        }
    }

    #[test]
    fn test_next_frame_goes_to_another_buffer() {
        let surface = LoopbackSurface::new(32, 32);
        let (mut engine, probe) = open_engine(&surface, &PresenterConfig::default());

        let first = frame_address(&mut engine);
        assert_eq!(frame_address(&mut engine), first);

        engine.present().expect("present succeeds");
        let second = frame_address(&mut engine);
        assert_ne!(first, second);

        engine.present().expect("present succeeds");
        assert_eq!(frame_address(&mut engine), first);
        assert_eq!(probe.last_frame().map(|f| f.index), Some(1));
    }

    #[test]
    fn test_circle_scenario_reaches_display() {
        let surface = LoopbackSurface::new(400, 400);
        let (mut engine, probe) = open_engine(&surface, &PresenterConfig::default());

        for _ in 0..3 {
            let mut view = engine.frame_buffer().expect("frame buffer available");
            assert!(view.stride() >= 1600);
            raster::fill_circle_simple(&mut view, 200, 200, 100, 0x00FF_5733);
            engine.present().expect("present succeeds");
        }

        assert_eq!(probe.pixel_at(200, 200), Some(0x00FF_5733));
        assert_eq!(probe.pixel_at(200, 101), Some(0x00FF_5733));
        assert_eq!(probe.pixel_at(0, 0), Some(0));
        assert_eq!(probe.pixel_at(399, 399), Some(0));
        assert_eq!(probe.presented_count(), 3);
    }

    #[test]
    fn test_null_surface_leaves_engine_uninitialized() {
        let probe = LoopbackProbe::new();
        let mut opened = false;
        let mut engine = PresentationEngine::new(None::<&LoopbackSurface>, &PresenterConfig::default(), |_| {
            opened = true;
            LoopbackDevice::open(LoopbackConfig::default(), &probe)
        });

        assert!(!opened);
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert_eq!(engine.construction_error(), Some(&ConstructionError::NullSurface));
        assert!(engine.frame_buffer().is_none());
        assert_eq!(
            engine.present(),
            Err(PresentError::Construction(ConstructionError::NullSurface))
        );

        let surface = LoopbackSurface::new(10, 10);
        assert_eq!(
            engine.resize(&surface),
            Err(PresentError::Construction(ConstructionError::NullSurface))
        );
        assert!(engine.device().is_none());
    }

    #[test]
    fn test_empty_surface_fails_construction() {
        let surface = LoopbackSurface::new(0, 300);
        let (mut engine, probe) = open_engine(&surface, &PresenterConfig::default());

        assert_eq!(
            engine.construction_error(),
            Some(&ConstructionError::EmptySurface { width: 0, height: 300 })
        );
        assert!(engine.frame_buffer().is_none());
        assert_eq!(probe.staging_created(), 0);
    }

    #[test]
    fn test_device_open_failure() {
        let surface = LoopbackSurface::new(10, 10);
        let probe = LoopbackProbe::new();
        let config = LoopbackConfig {
            fail_open: Some(DeviceError::DeviceLost),
            ..LoopbackConfig::default()
        };
        let engine = PresentationEngine::new(Some(&surface), &PresenterConfig::default(), |_| {
            LoopbackDevice::open(config, &probe)
        });

        assert!(!engine.is_ready());
        assert_eq!(
            engine.construction_error(),
            Some(&ConstructionError::Device(DeviceError::DeviceLost))
        );
    }

    #[test]
    fn test_staging_allocation_failure_releases_everything() {
        let surface = LoopbackSurface::new(10, 10);
        let probe = LoopbackProbe::new();
        probe.fail_staging_allocations(true);
        let engine = PresentationEngine::new(Some(&surface), &PresenterConfig::default(), |_| {
            LoopbackDevice::open(LoopbackConfig::default(), &probe)
        });

        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert_eq!(
            engine.construction_error(),
            Some(&ConstructionError::Device(DeviceError::OutOfMemory))
        );
        assert_eq!(
            probe.events(),
            vec![LoopbackEvent::SwapChainDropped, LoopbackEvent::DeviceDropped]
        );
    }

    #[test]
    fn test_resize_to_same_size_is_a_no_op() {
        let surface = LoopbackSurface::new(64, 48);
        let (mut engine, probe) = open_engine(&surface, &PresenterConfig::default());
        let before = frame_address(&mut engine);

        assert_eq!(engine.resize(&surface), Ok(false));
        assert_eq!(engine.resize(&surface), Ok(false));

        assert_eq!(frame_address(&mut engine), before);
        assert_eq!(probe.staging_created(), 2);
        assert_eq!(probe.swap_chain_resizes(), 0);
        assert_eq!(engine.state(), EngineState::DeviceReady);
    }

    #[test]
    fn test_resize_rebuilds_buffers() {
        let surface = LoopbackSurface::new(400, 400);
        let config = PresenterConfig::default().with_buffer_count(3);
        let (mut engine, probe) = open_engine(&surface, &config);
        engine.present().expect("present succeeds");

        surface.set_size(640, 480);
        assert_eq!(engine.resize(&surface), Ok(true));

        assert_eq!(engine.state(), EngineState::DeviceReady);
        assert_eq!(engine.size(), SurfaceSize::new(640, 480));
        assert_eq!(engine.current_index(), 1);
        assert_eq!(probe.staging_live(), 3);
        assert_eq!(probe.staging_created(), 6);
        assert_eq!(probe.swap_chain_resizes(), 1);

        {
            let mut view = engine.frame_buffer().expect("frame buffer available");
            assert_eq!(view.size(), SurfaceSize::new(640, 480));
            assert!(view.stride() >= 640 * 4);
            view.set_pixel(639, 479, 0x0012_3456);
        }
        engine.present().expect("present succeeds");
        assert_eq!(probe.pixel_at(639, 479), Some(0x0012_3456));

        assert_eq!(engine.resize(&surface), Ok(false));
        assert_eq!(probe.staging_created(), 6);
    }

    #[test]
    fn test_resize_to_empty_surface_is_deferred() {
        let surface = LoopbackSurface::new(100, 100);
        let (mut engine, probe) = open_engine(&surface, &PresenterConfig::default());

        surface.set_size(0, 0);
        assert_eq!(engine.resize(&surface), Ok(false));
        assert_eq!(engine.size(), SurfaceSize::new(100, 100));
        assert!(engine.frame_buffer().is_some());

        surface.set_size(120, 80);
        assert_eq!(engine.resize(&surface), Ok(true));
        assert_eq!(probe.swap_chain_resizes(), 1);
    }

    #[test]
    fn test_resize_failure_returns_to_uninitialized() {
        let surface = LoopbackSurface::new(100, 100);
        let (mut engine, probe) = open_engine(&surface, &PresenterConfig::default());

        probe.fail_next_resize();
        surface.set_size(200, 200);
        let err = engine.resize(&surface).expect_err("resize fails");

        assert_eq!(err, PresentError::Resize(DeviceError::OutOfDate));
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert!(engine.frame_buffer().is_none());
        assert!(engine.device().is_none());
        assert_eq!(probe.staging_live(), 0);
        assert!(probe.events().contains(&LoopbackEvent::DeviceDropped));
        assert!(matches!(engine.present(), Err(PresentError::NotReady { .. })));
    }

    #[test]
    fn test_map_failure_yields_no_frame_buffer_until_recovery() {
        let surface = LoopbackSurface::new(20, 20);
        let (mut engine, probe) = open_engine(&surface, &PresenterConfig::default());

        probe.fail_maps(true);
        let err = engine.present().expect_err("remap fails");
        assert_eq!(err, PresentError::Map(DeviceError::OutOfMemory));
        assert!(err.is_recoverable());
        assert_eq!(probe.presented_count(), 1);
        assert!(!engine.is_mapped());
        assert!(engine.frame_buffer().is_none());
        assert!(engine.is_ready());

        probe.fail_maps(false);
        engine.present().expect("present succeeds");
        assert!(engine.frame_buffer().is_some());
        assert_eq!(engine.current_index(), 0);
    }

    #[test]
    fn test_destroy_releases_in_order() {
        let surface = LoopbackSurface::new(20, 20);
        let config = PresenterConfig::default().with_buffer_count(3);
        let (mut engine, probe) = open_engine(&surface, &config);
        probe.clear_events();

        engine.destroy();
        assert_eq!(engine.state(), EngineState::Destroyed);
        assert!(engine.frame_buffer().is_none());
        assert_eq!(
            probe.events(),
            vec![
                LoopbackEvent::Unmapped(0),
                LoopbackEvent::StagingDropped(0),
                LoopbackEvent::StagingDropped(1),
                LoopbackEvent::StagingDropped(2),
                LoopbackEvent::SwapChainDropped,
                LoopbackEvent::DeviceDropped,
            ]
        );

        engine.destroy();
        drop(engine);
        assert_eq!(probe.events().len(), 6);
    }

    #[test]
    fn test_drop_tears_down() {
        let surface = LoopbackSurface::new(20, 20);
        let (engine, probe) = open_engine(&surface, &PresenterConfig::default());
        drop(engine);

        assert_eq!(probe.staging_live(), 0);
        assert_eq!(probe.events().last(), Some(&LoopbackEvent::DeviceDropped));
    }

    #[test]
    fn test_present_copies_unmapped_buffer() {
        let surface = LoopbackSurface::new(4, 4);
        let (mut engine, probe) = open_engine(&surface, &PresenterConfig::default());
        probe.clear_events();

        engine.present().expect("present succeeds");
        assert_eq!(
            probe.events(),
            vec![
                LoopbackEvent::Unmapped(0),
                LoopbackEvent::Copied { buffer: 0, index: 0 },
                LoopbackEvent::Presented(0),
                LoopbackEvent::Mapped(1),
            ]
        );
    }

    fn mapped_balance(probe: &LoopbackProbe) -> i64 {
        probe.events().iter().fold(0, |balance, event| match event {
            LoopbackEvent::Mapped(_) => balance + 1,
            LoopbackEvent::Unmapped(_) => balance - 1,
            _ => balance,
        })
    }

    #[test]
    fn test_exactly_one_buffer_mapped_across_presents() {
        let surface = LoopbackSurface::new(8, 8);
        let config = PresenterConfig::default().with_buffer_count(3);
        let (mut engine, probe) = open_engine(&surface, &config);

        for n in 1..=7 {
            engine.present().expect("present succeeds");
            assert!(engine.is_mapped());
            assert_eq!(mapped_balance(&probe), 1, "after present {n}");
            assert_eq!(engine.current_index(), n % 3);
        }
    }

    #[test]
    fn test_single_buffer_reuses_index_zero() {
        let surface = LoopbackSurface::new(6, 6);
        let config = PresenterConfig::default().with_buffer_count(1);
        let (mut engine, probe) = open_engine(&surface, &config);
        assert_eq!(engine.buffer_count(), 1);

        for n in 0..5u32 {
            let color = 0x0010_0000 + n;
            engine.frame_buffer().expect("frame buffer available").set_pixel(2, 3, color);
            engine.present().expect("present succeeds");

            assert_eq!(engine.current_index(), 0);
            assert_eq!(probe.pixel_at(2, 3), Some(color));
            assert_eq!(probe.last_frame().map(|frame| frame.index), Some(0));
        }

        let events = probe.events();
        let mapped = events.iter().filter(|e| matches!(e, LoopbackEvent::Mapped(_))).count();
        let unmapped = events.iter().filter(|e| matches!(e, LoopbackEvent::Unmapped(_))).count();
        assert_eq!(unmapped, 5);
        assert_eq!(mapped, unmapped + 1);
        assert!(events
            .iter()
            .all(|e| !matches!(e, LoopbackEvent::Mapped(i) | LoopbackEvent::Unmapped(i) if *i != 0)));
    }

    #[test]
    fn test_resize_map_failure_keeps_engine_ready() {
        let surface = LoopbackSurface::new(10, 10);
        let (mut engine, probe) = open_engine(&surface, &PresenterConfig::default());

        probe.fail_maps(true);
        surface.set_size(30, 20);
        assert_eq!(engine.resize(&surface), Err(PresentError::Map(DeviceError::OutOfMemory)));
        assert!(engine.is_ready());
        assert_eq!(engine.size(), SurfaceSize::new(30, 20));
        assert!(engine.frame_buffer().is_none());

        probe.fail_maps(false);
        engine.present().expect("present succeeds");
        assert_eq!(engine.frame_buffer().map(|view| view.size()), Some(SurfaceSize::new(30, 20)));
    }
}
