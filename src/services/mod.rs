// Quote pricing and editing
pub mod pricing;
pub mod quote_editor;

// Quote book and service agreements
pub mod contracts;
pub mod quote_tracker;

// Warehouse dashboard
pub mod fulfillment;
