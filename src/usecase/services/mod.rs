pub mod grid_service;
