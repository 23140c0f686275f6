/*!
# EcoWatt

A self-contained energy consumption forecasting dashboard.

## Overview

EcoWatt generates or ingests daily electricity consumption series,
fits a lag-feature linear regression model to them, and serves
role-gated user and admin dashboards with charts, forecasts and CSV
downloads.

## Architecture

The crate is a library plus one web binary. The web layer (axum) holds
the current dataset, trained model and last forecast in shared state;
the numeric and storage layers below it are synchronous and free of web
types.

## Modules

* [`auth`] - flat-file credential store with user and admin collections
* [`datagen`] - deterministic synthetic consumption series generator
* [`model`] - lag-feature regression training and iterative forecasting
* [`loader`] - CSV parsing and validation for uploaded datasets
* [`saving`] - compressed model persistence and dataset files
* [`analysis`] - summary statistics, monthly averages and histograms
* [`downloader`] - CSV report rendering for the download endpoints
* [`graph`] - PNG chart rendering with plotters
* [`login`] - session management and login/register/logout handlers
* [`app`] - router, shared state and dashboard handlers
*/

pub mod analysis;
pub mod app;
pub mod auth;
pub mod datagen;
pub mod downloader;
pub mod graph;
pub mod loader;
pub mod login;
pub mod model;
pub mod saving;

pub use auth::{Repository, Role, UserRecord, UserStore};
pub use datagen::{Observation, generate_energy_data};
pub use model::{EnergyModel, ForecastPoint, WINDOW, prepare_data};
