use std::io::Write;

use crate::domain::{EngineStore, Error};
use crate::engine::Engine;

impl<S: EngineStore> Engine<S> {
    /// Write the final balances report, one row per user the engine has
    /// seen, in user-id order.
    pub fn write_balances<W: Write>(&self, out: &mut W) -> Result<(), Error> {
        writeln!(
            out,
            "user,status,available,held,in_transit,credit,lifetime_earned,total"
        )?;
        let mut users = self.store.user_ids();
        users.sort_unstable();
        for user in users {
            let balance = self.balance_of(user)?;
            writeln!(
                out,
                "{},{},{},{},{},{},{},{}",
                user,
                self.account_status(user),
                balance.available,
                balance.held,
                balance.in_transit,
                balance.credit,
                balance.lifetime_earned,
                balance.total
            )?;
        }
        Ok(())
    }
}
