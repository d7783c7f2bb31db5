pub mod escalation_loop;
