mod analytics;
mod auth;
mod calendar;
mod malformed;
mod rooms;
mod social;
mod streams;
mod testapp;
